//! Linear-time tidy tree placement (Buchheim, Jünger & Leipert's improvement of Walker's
//! algorithm), with the same conventions as `d3-hierarchy`'s `tree()`:
//!
//! - siblings are separated by 1 unit, nodes with different parents by 2 units
//! - parents are centred over their first and last child
//! - the root ends up at breadth 0; callers rescale the result

use sprig_core::Node;

/// Flattened pre-order view of a [`Node`] tree.
#[derive(Debug, Clone)]
pub(crate) struct Hierarchy<'a> {
    pub(crate) nodes: Vec<&'a Node>,
    pub(crate) parent: Vec<Option<usize>>,
    pub(crate) children: Vec<Vec<usize>>,
    pub(crate) depth: Vec<usize>,
    /// Position among siblings.
    pub(crate) number: Vec<usize>,
}

impl<'a> Hierarchy<'a> {
    pub(crate) fn new(root: &'a Node) -> Self {
        let mut h = Self {
            nodes: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
            depth: Vec::new(),
            number: Vec::new(),
        };
        let mut stack: Vec<(&'a Node, Option<usize>, usize, usize)> = vec![(root, None, 0, 0)];
        while let Some((node, parent, depth, number)) = stack.pop() {
            let idx = h.nodes.len();
            h.nodes.push(node);
            h.parent.push(parent);
            h.children.push(Vec::new());
            h.depth.push(depth);
            h.number.push(number);
            if let Some(p) = parent {
                h.children[p].push(idx);
            }
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((child.as_ref(), Some(idx), depth + 1, i));
            }
        }
        h
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.depth.iter().copied().max().unwrap_or(0)
    }

    pub(crate) fn separation(&self, a: usize, b: usize) -> f64 {
        if self.parent[a] == self.parent[b] {
            1.0
        } else {
            2.0
        }
    }
}

struct Walker<'h, 'a> {
    h: &'h Hierarchy<'a>,
    prelim: Vec<f64>,
    modifier: Vec<f64>,
    change: Vec<f64>,
    shift: Vec<f64>,
    thread: Vec<Option<usize>>,
    ancestor: Vec<usize>,
    default_ancestor: Vec<Option<usize>>,
}

/// Breadth coordinates (in separation units) for every node of `h`, indexed like `h.nodes`.
pub(crate) fn tidy_breadth(h: &Hierarchy<'_>) -> Vec<f64> {
    let n = h.len();
    if n == 0 {
        return Vec::new();
    }
    let mut w = Walker {
        h,
        prelim: vec![0.0; n],
        modifier: vec![0.0; n],
        change: vec![0.0; n],
        shift: vec![0.0; n],
        thread: vec![None; n],
        ancestor: (0..n).collect(),
        default_ancestor: vec![None; n],
    };
    w.first_walk(0);

    let mut x = vec![0.0; n];
    let root_mod = -w.prelim[0];
    w.second_walk(0, root_mod, &mut x);
    x
}

impl Walker<'_, '_> {
    fn left_sibling(&self, v: usize) -> Option<usize> {
        let p = self.h.parent[v]?;
        let i = self.h.number[v];
        (i > 0).then(|| self.h.children[p][i - 1])
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.h.children[v].first().copied().or(self.thread[v])
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.h.children[v].last().copied().or(self.thread[v])
    }

    fn first_walk(&mut self, v: usize) {
        let h = self.h;
        for &child in &h.children[v] {
            self.first_walk(child);
        }

        let w = self.left_sibling(v);
        let children = &h.children[v];
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            self.execute_shifts(v);
            let midpoint = (self.prelim[first] + self.prelim[last]) / 2.0;
            if let Some(w) = w {
                self.prelim[v] = self.prelim[w] + h.separation(v, w);
                self.modifier[v] = self.prelim[v] - midpoint;
            } else {
                self.prelim[v] = midpoint;
            }
        } else if let Some(w) = w {
            self.prelim[v] = self.prelim[w] + h.separation(v, w);
        }

        if let Some(p) = h.parent[v] {
            let current = self.default_ancestor[p].unwrap_or(h.children[p][0]);
            let next = self.apportion(v, w, current);
            self.default_ancestor[p] = Some(next);
        }
    }

    fn second_walk(&mut self, v: usize, parent_mod: f64, x: &mut [f64]) {
        x[v] = self.prelim[v] + parent_mod;
        self.modifier[v] += parent_mod;
        let m = self.modifier[v];
        let h = self.h;
        for &child in &h.children[v] {
            self.second_walk(child, m, x);
        }
    }

    fn execute_shifts(&mut self, v: usize) {
        let h = self.h;
        let mut shift = 0.0;
        let mut change = 0.0;
        for &w in h.children[v].iter().rev() {
            self.prelim[w] += shift;
            self.modifier[w] += shift;
            change += self.change[w];
            shift += self.shift[w] + change;
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let gap = self.h.number[wp] as f64 - self.h.number[wm] as f64;
        let change = shift / gap;
        self.change[wp] -= change;
        self.shift[wp] += shift;
        self.change[wm] += change;
        self.prelim[wp] += shift;
        self.modifier[wp] += shift;
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let a = self.ancestor[vim];
        if self.h.parent[a] == self.h.parent[v] {
            a
        } else {
            ancestor
        }
    }

    fn apportion(&mut self, v: usize, w: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = w else {
            return ancestor;
        };
        let Some(parent) = self.h.parent[v] else {
            return ancestor;
        };

        // inner/outer contours of the right (p) and left (m) subtree forests
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.h.children[parent][0];
        let mut sip = self.modifier[vip];
        let mut sop = self.modifier[vop];
        let mut sim = self.modifier[vim];
        let mut som = self.modifier[vom];

        let (rest_im, rest_ip) = loop {
            let (Some(next_im), Some(next_ip)) = (self.next_right(vim), self.next_left(vip)) else {
                break (self.next_right(vim), self.next_left(vip));
            };
            let (Some(next_om), Some(next_op)) = (self.next_left(vom), self.next_right(vop))
            else {
                break (None, None);
            };
            vim = next_im;
            vip = next_ip;
            vom = next_om;
            vop = next_op;
            self.ancestor[vop] = v;

            let shift =
                self.prelim[vim] + sim - self.prelim[vip] - sip + self.h.separation(vim, vip);
            if shift > 0.0 {
                let wm = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(wm, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.modifier[vim];
            sip += self.modifier[vip];
            som += self.modifier[vom];
            sop += self.modifier[vop];
        };

        if let Some(next_im) = rest_im {
            if self.next_right(vop).is_none() {
                self.thread[vop] = Some(next_im);
                self.modifier[vop] += sim - sop;
            }
        }
        if let Some(next_ip) = rest_ip {
            if self.next_left(vom).is_none() {
                self.thread[vom] = Some(next_ip);
                self.modifier[vom] += sip - som;
                ancestor = v;
            }
        }
        ancestor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str) -> Node {
        Node::new(id, id)
    }

    #[test]
    fn hierarchy_is_pre_order() {
        let root = Node::root("r").with_children([
            leaf("a").with_children([leaf("a1"), leaf("a2")]),
            leaf("b"),
        ]);
        let h = Hierarchy::new(&root);
        let ids: Vec<&str> = h.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["root", "a", "a1", "a2", "b"]);
        assert_eq!(h.parent, [None, Some(0), Some(1), Some(1), Some(0)]);
        assert_eq!(h.depth, [0, 1, 2, 2, 1]);
        assert_eq!(h.number, [0, 0, 0, 1, 1]);
        assert_eq!(h.max_depth(), 2);
    }

    #[test]
    fn single_node_sits_at_zero() {
        let root = Node::root("r");
        let h = Hierarchy::new(&root);
        assert_eq!(tidy_breadth(&h), [0.0]);
    }

    #[test]
    fn siblings_are_one_unit_apart_and_parent_centred() {
        let root = Node::root("r").with_children([leaf("a"), leaf("b"), leaf("c")]);
        let h = Hierarchy::new(&root);
        let x = tidy_breadth(&h);
        assert_eq!(x[2] - x[1], 1.0);
        assert_eq!(x[3] - x[2], 1.0);
        assert_eq!(x[0], (x[1] + x[3]) / 2.0);
        assert_eq!(x[0], 0.0);
    }

    #[test]
    fn cousins_are_two_units_apart() {
        let root = Node::root("r").with_children([
            leaf("a").with_children([leaf("a1")]),
            leaf("b").with_children([leaf("b1")]),
        ]);
        let h = Hierarchy::new(&root);
        let x = tidy_breadth(&h);
        // pre-order: root, a, a1, b, b1
        assert_eq!(x[4] - x[2], 2.0);
        assert_eq!(x[3] - x[1], 2.0);
    }

    #[test]
    fn subtrees_do_not_overlap_on_any_level() {
        let root = Node::root("r").with_children([
            leaf("a").with_children([
                leaf("a1").with_children([leaf("a11"), leaf("a12"), leaf("a13")]),
                leaf("a2"),
            ]),
            leaf("b"),
            leaf("c").with_children([
                leaf("c1"),
                leaf("c2").with_children([leaf("c21"), leaf("c22")]),
            ]),
        ]);
        let h = Hierarchy::new(&root);
        let x = tidy_breadth(&h);

        for depth in 0..=h.max_depth() {
            let row: Vec<usize> = (0..h.len()).filter(|&i| h.depth[i] == depth).collect();
            // pre-order already lists each level left to right
            for pair in row.windows(2) {
                let gap = x[pair[1]] - x[pair[0]];
                assert!(
                    gap + 1e-9 >= h.separation(pair[0], pair[1]),
                    "level {depth}: {} and {} only {gap} apart",
                    h.nodes[pair[0]].id,
                    h.nodes[pair[1]].id
                );
            }
        }
    }
}
