// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::cmp::Ordering;
use unicase::Ascii;

use crate::node::PropNode;

pub(crate) type Link = Option<Box<PropNode>>;

/// Segment names compare case-insensitively (ASCII), so `Desc` and `desc` are one property.
pub(crate) fn compare_names(a: &str, b: &str) -> Ordering {
    Ascii::new(a).cmp(&Ascii::new(b))
}

fn height(link: &Link) -> i32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn height_diff(node: &PropNode) -> i32 {
    height(&node.right) - height(&node.left)
}

fn fixup_height(node: &mut PropNode) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn rotate_left(mut a: Box<PropNode>) -> Box<PropNode> {
    let Some(mut b) = a.right.take() else {
        return a;
    };
    a.right = b.left.take();
    fixup_height(&mut a);
    b.left = Some(a);
    fixup_height(&mut b);
    b
}

fn rotate_right(mut a: Box<PropNode>) -> Box<PropNode> {
    let Some(mut b) = a.left.take() else {
        return a;
    };
    a.left = b.right.take();
    fixup_height(&mut a);
    b.right = Some(a);
    fixup_height(&mut b);
    b
}

fn balance(mut node: Box<PropNode>) -> Box<PropNode> {
    let dh = height_diff(&node);
    if dh >= 2 {
        if node.right.as_ref().is_some_and(|r| height_diff(r) < 0) {
            node.right = node.right.take().map(rotate_right);
        }
        rotate_left(node)
    } else if dh <= -2 {
        if node.left.as_ref().is_some_and(|l| height_diff(l) > 0) {
            node.left = node.left.take().map(rotate_left);
        }
        rotate_right(node)
    } else {
        fixup_height(&mut node);
        node
    }
}

fn insert_into(link: &mut Link, name: &str) {
    match link {
        None => {
            *link = Some(Box::new(PropNode::new(name)));
            return;
        }
        Some(node) => match compare_names(name, node.name()) {
            Ordering::Less => insert_into(&mut node.left, name),
            Ordering::Greater => insert_into(&mut node.right, name),
            Ordering::Equal => return,
        },
    }
    if let Some(node) = link.take() {
        *link = Some(balance(node));
    }
}

fn remove_max(link: &mut Link) -> Link {
    let mut node = link.take()?;
    if node.right.is_some() {
        let max = remove_max(&mut node.right);
        *link = Some(balance(node));
        max
    } else {
        *link = node.left.take();
        Some(node)
    }
}

fn remove_from(link: &mut Link, name: &str) -> Link {
    let mut node = link.take()?;
    match compare_names(name, node.name()) {
        Ordering::Less => {
            let removed = remove_from(&mut node.left, name);
            *link = Some(balance(node));
            removed
        }
        Ordering::Greater => {
            let removed = remove_from(&mut node.right, name);
            *link = Some(balance(node));
            removed
        }
        Ordering::Equal => {
            let left = node.left.take();
            let right = node.right.take();
            *link = match (left, right) {
                (None, right) => right,
                (left, None) => left,
                (left, right) => {
                    let mut left = left;
                    let Some(mut successor) = remove_max(&mut left) else {
                        panic!("property tree lost its left subtree while removing {name}");
                    };
                    successor.left = left;
                    successor.right = right;
                    Some(balance(successor))
                }
            };
            Some(node)
        }
    }
}

fn leftmost(mut node: &PropNode) -> &PropNode {
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    node
}

fn next_node<'a>(link: &'a Link, name: &str) -> Option<&'a PropNode> {
    let node = link.as_deref()?;
    match compare_names(name, node.name()) {
        Ordering::Less => next_node(&node.left, name).or(Some(node)),
        Ordering::Greater => next_node(&node.right, name),
        Ordering::Equal => node.right.as_deref().map(leftmost),
    }
}

/// One level of a property tree: an AVL tree of uniquely named nodes.
#[derive(Debug, Clone, Default)]
pub struct PropDir {
    root: Link,
}

impl PropDir {
    #[must_use]
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn find(&self, name: &str) -> Option<&PropNode> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            match compare_names(name, node.name()) {
                Ordering::Less => cur = node.left.as_deref(),
                Ordering::Greater => cur = node.right.as_deref(),
                Ordering::Equal => return Some(node),
            }
        }
        None
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut PropNode> {
        let mut cur = self.root.as_deref_mut();
        while let Some(node) = cur {
            match compare_names(name, node.name()) {
                Ordering::Less => cur = node.left.as_deref_mut(),
                Ordering::Greater => cur = node.right.as_deref_mut(),
                Ordering::Equal => return Some(node),
            }
        }
        None
    }

    /// Find the node with this name, creating a valueless one if there is none.
    pub fn insert(&mut self, name: &str) -> &mut PropNode {
        insert_into(&mut self.root, name);
        match self.find_mut(name) {
            Some(node) => node,
            None => panic!("property node {name} missing right after insertion"),
        }
    }

    /// Detach the named node, with everything below it.
    pub fn remove(&mut self, name: &str) -> Option<PropNode> {
        remove_from(&mut self.root, name).map(|node| *node)
    }

    pub fn first(&self) -> Option<&PropNode> {
        self.root.as_deref().map(leftmost)
    }

    /// The first node that sorts after `name`, whether or not `name` itself exists.
    pub fn next_after(&self, name: &str) -> Option<&PropNode> {
        if name.is_empty() {
            return None;
        }
        next_node(&self.root, name)
    }

    /// In-order iteration over this level only.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: vec![] };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Visit every node on this level, in no particular order.
    pub fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut PropNode)) {
        fn visit(link: &mut Link, f: &mut dyn FnMut(&mut PropNode)) {
            if let Some(node) = link.as_deref_mut() {
                visit(&mut node.left, f);
                f(node);
                visit(&mut node.right, f);
            }
        }
        visit(&mut self.root, f);
    }

    pub fn height(&self) -> usize {
        height(&self.root) as usize
    }

    /// Recursive size of this level and every directory below it.
    pub fn size_of(&self) -> usize {
        self.iter()
            .map(|node| node.node_size() + node.propdir().size_of())
            .sum()
    }

    /// Check the AVL shape and key order of this level and every directory below it.
    pub fn is_well_formed(&self) -> bool {
        fn check(link: &Link) -> Option<i32> {
            let Some(node) = link.as_deref() else {
                return Some(0);
            };
            let lh = check(&node.left)?;
            let rh = check(&node.right)?;
            if (lh - rh).abs() > 1 || node.height != 1 + lh.max(rh) {
                return None;
            }
            if !node.propdir().is_well_formed() {
                return None;
            }
            Some(node.height)
        }
        let ordered = self
            .iter()
            .zip(self.iter().skip(1))
            .all(|(a, b)| compare_names(a.name(), b.name()) == Ordering::Less);
        ordered && check(&self.root).is_some()
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a PropNode>,
}

impl<'a> Iter<'a> {
    fn push_left(&mut self, mut node: Option<&'a PropNode>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PropNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a PropDir {
    type Item = &'a PropNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
