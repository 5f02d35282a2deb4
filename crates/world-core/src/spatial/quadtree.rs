//! Quadtree
//!
//! Point quadtree over a fixed boundary. Leaves split once they exceed
//! `max_entries`, down to `max_depth`; boundary membership is inclusive,
//! and a point on an internal split line always routes to the first
//! containing child, so insert and remove agree on placement.

/// Axis-aligned rectangle with inclusive edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// True when the point lies inside the rectangle, edges included.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// True when the rectangles share any point, edges included.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }

    /// Squared distance from a point to the nearest point of the rectangle.
    fn min_dist_sq(&self, px: f64, py: f64) -> f64 {
        let dx = (self.x - px).max(0.0).max(px - (self.x + self.width));
        let dy = (self.y - py).max(0.0).max(py - (self.y + self.height));
        dx * dx + dy * dy
    }

    fn quadrants(&self) -> [Rect; 4] {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [
            Rect::new(self.x, self.y, hw, hh),
            Rect::new(self.x + hw, self.y, hw, hh),
            Rect::new(self.x, self.y + hh, hw, hh),
            Rect::new(self.x + hw, self.y + hh, hw, hh),
        ]
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    x: f64,
    y: f64,
    item: T,
}

#[derive(Debug, Clone)]
struct Node<T> {
    bounds: Rect,
    depth: usize,
    entries: Vec<Entry<T>>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T> Node<T> {
    fn leaf(bounds: Rect, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, entry: Entry<T>, max_entries: usize, max_depth: usize) {
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains(entry.x, entry.y) {
                    return child.insert(entry, max_entries, max_depth);
                }
            }
            // Floating-point edge case: keep the entry here rather than lose it.
            self.entries.push(entry);
            return;
        }
        self.entries.push(entry);
        if self.entries.len() > max_entries && self.depth < max_depth {
            self.subdivide(max_entries, max_depth);
        }
    }

    fn subdivide(&mut self, max_entries: usize, max_depth: usize) {
        let quads = self.bounds.quadrants();
        let mut children = Box::new([
            Node::leaf(quads[0], self.depth + 1),
            Node::leaf(quads[1], self.depth + 1),
            Node::leaf(quads[2], self.depth + 1),
            Node::leaf(quads[3], self.depth + 1),
        ]);
        let mut kept = Vec::new();
        for entry in self.entries.drain(..) {
            let target = children
                .iter_mut()
                .find(|child| child.bounds.contains(entry.x, entry.y));
            match target {
                Some(child) => child.insert(entry, max_entries, max_depth),
                // Rounding on the split lines can exclude a far-edge point
                // from every child; it stays on this node.
                None => kept.push(entry),
            }
        }
        self.entries = kept;
        self.children = Some(children);
    }

    fn remove(&mut self, x: f64, y: f64, item: &T) -> bool
    where
        T: PartialEq,
    {
        if let Some(position) = self
            .entries
            .iter()
            .position(|e| e.x == x && e.y == y && e.item == *item)
        {
            self.entries.remove(position);
            return true;
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains(x, y) && child.remove(x, y, item) {
                    return true;
                }
            }
        }
        false
    }

    fn query_rect<'a>(&'a self, rect: &Rect, out: &mut Vec<(f64, f64, &'a T)>) {
        if !self.bounds.intersects(rect) {
            return;
        }
        for entry in &self.entries {
            if rect.contains(entry.x, entry.y) {
                out.push((entry.x, entry.y, &entry.item));
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_rect(rect, out);
            }
        }
    }

    fn query_nearest<'a>(
        &'a self,
        x: f64,
        y: f64,
        k: usize,
        best: &mut Vec<(f64, f64, f64, &'a T)>,
    ) {
        if best.len() == k {
            let worst = best[best.len() - 1].0;
            if self.bounds.min_dist_sq(x, y) > worst {
                return;
            }
        }
        for entry in &self.entries {
            let dist_sq = (entry.x - x).powi(2) + (entry.y - y).powi(2);
            if best.len() < k || dist_sq < best[best.len() - 1].0 {
                let at = best.partition_point(|&(d, ..)| d <= dist_sq);
                best.insert(at, (dist_sq, entry.x, entry.y, &entry.item));
                best.truncate(k);
            }
        }
        if let Some(children) = self.children.as_ref() {
            // Visit closer children first for tighter pruning.
            let mut order: Vec<&Node<T>> = children.iter().collect();
            order.sort_by(|a, b| {
                a.bounds
                    .min_dist_sq(x, y)
                    .partial_cmp(&b.bounds.min_dist_sq(x, y))
                    .unwrap()
            });
            for child in order {
                child.query_nearest(x, y, k, best);
            }
        }
    }

    fn drain_into(&mut self, out: &mut Vec<Entry<T>>) {
        out.append(&mut self.entries);
        if let Some(mut children) = self.children.take() {
            for child in children.iter_mut() {
                child.drain_into(out);
            }
        }
    }
}

/// Default leaf capacity before subdivision.
pub const DEFAULT_MAX_ENTRIES: usize = 16;

/// Default subdivision depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Point quadtree over a fixed boundary.
#[derive(Debug, Clone)]
pub struct Quadtree<T> {
    root: Node<T>,
    max_entries: usize,
    max_depth: usize,
    len: usize,
}

impl<T> Quadtree<T> {
    /// Creates a tree with default capacity limits.
    pub fn new(bounds: Rect) -> Self {
        Self::with_limits(bounds, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_DEPTH)
    }

    pub fn with_limits(bounds: Rect, max_entries: usize, max_depth: usize) -> Self {
        Self {
            root: Node::leaf(bounds, 0),
            max_entries: max_entries.max(1),
            max_depth,
            len: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    /// Inserts a point. Returns false (and stores nothing) when the point
    /// is out of bounds.
    pub fn insert(&mut self, x: f64, y: f64, item: T) -> bool {
        if !self.root.bounds.contains(x, y) {
            return false;
        }
        self.root
            .insert(Entry { x, y, item }, self.max_entries, self.max_depth);
        self.len += 1;
        true
    }

    /// Removes the first entry matching `(x, y, item)`. Returns false when
    /// no such entry exists.
    pub fn remove(&mut self, x: f64, y: f64, item: &T) -> bool
    where
        T: PartialEq,
    {
        if self.root.remove(x, y, item) {
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// All points inside the rectangle, edges included.
    pub fn query_rect(&self, rect: &Rect) -> Vec<(f64, f64, &T)> {
        let mut out = Vec::new();
        self.root.query_rect(rect, &mut out);
        out
    }

    /// All points within `radius` of `(x, y)`, boundary included.
    pub fn query_radius(&self, x: f64, y: f64, radius: f64) -> Vec<(f64, f64, &T)> {
        let bounding = Rect::new(x - radius, y - radius, radius * 2.0, radius * 2.0);
        let radius_sq = radius * radius;
        let mut out = Vec::new();
        self.root.query_rect(&bounding, &mut out);
        out.retain(|&(px, py, _)| (px - x).powi(2) + (py - y).powi(2) <= radius_sq);
        out
    }

    /// Up to `k` points nearest to `(x, y)`, closest first.
    pub fn query_nearest(&self, x: f64, y: f64, k: usize) -> Vec<(f64, f64, &T)> {
        if k == 0 {
            return Vec::new();
        }
        let mut best = Vec::with_capacity(k + 1);
        self.root.query_nearest(x, y, k, &mut best);
        best.into_iter().map(|(_, px, py, item)| (px, py, item)).collect()
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every entry, keeping the boundary.
    pub fn clear(&mut self) {
        self.root = Node::leaf(self.root.bounds, 0);
        self.len = 0;
    }

    /// Rebuilds the tree from its current entries. Intended after bulk
    /// removals leave the structure lopsided.
    pub fn rebalance(&mut self) {
        let mut entries = Vec::with_capacity(self.len);
        self.root.drain_into(&mut entries);
        self.root = Node::leaf(self.root.bounds, 0);
        self.len = 0;
        for entry in entries {
            self.root
                .insert(entry, self.max_entries, self.max_depth);
            self.len += 1;
        }
    }
}
