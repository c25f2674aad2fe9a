//! Ordering groups: disjoint groups of boolean variables the BDD encoder
//! keeps adjacent in the variable order.

use crate::symb::SymbTable;
use smv_ast::{Node, NodeList};
use smv_data_structures::{map::FxHashMap, newtype_index};

newtype_index! {
    /// A dense handle to one ordering group.
    pub struct GroupId;
}

/// Disjoint groups of boolean variables, built from a parsed ordering list.
///
/// A variable belongs to at most one group; re-adding it to its own group
/// is a no-op, while moving it to another group is a programming error.
#[derive(Default)]
pub struct OrdGroups<'a> {
    groups: Vec<Vec<Node<'a>>>,
    group_of: FxHashMap<Node<'a>, GroupId>,
}

impl<'a> OrdGroups<'a> {
    /// Creates an empty group set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new empty group.
    pub fn create_group(&mut self) -> GroupId {
        let gid = GroupId::from_usize(self.groups.len());
        self.groups.push(Vec::new());
        gid
    }

    /// Adds `name` to `group`. Idempotent for the group the variable is
    /// already in.
    ///
    /// # Panics
    ///
    /// Panics if `name` already belongs to a different group, or `group`
    /// does not exist.
    pub fn add_variable(&mut self, name: Node<'a>, group: GroupId) {
        assert!(group.index() < self.groups.len(), "group {group} does not exist");
        match self.group_of.get(&name) {
            Some(&existing) if existing == group => {}
            Some(&existing) => {
                panic!("{name} is already in group {existing}, cannot move it to {group}")
            }
            None => {
                self.groups[group.index()].push(name);
                self.group_of.insert(name, group);
            }
        }
    }

    /// Adds every variable of `names` to `group`.
    pub fn add_variables(&mut self, names: &NodeList<'a>, group: GroupId) {
        for name in names.iter() {
            self.add_variable(name, group);
        }
    }

    /// The group `name` belongs to, if any.
    pub fn group_of(&self, name: Node<'a>) -> Option<GroupId> {
        self.group_of.get(&name).copied()
    }

    /// The variables of `group`, in insertion order.
    pub fn vars_in_group(&self, group: GroupId) -> &[Node<'a>] {
        &self.groups[group.index()]
    }

    /// The number of groups.
    pub fn size(&self) -> usize {
        self.groups.len()
    }

    /// Builds singleton groups from an ordering list, keeping only the
    /// names the table knows as boolean variables; anything else is
    /// reported as a warning and skipped. Names already grouped (i.e.
    /// duplicates that survived parsing) are skipped silently.
    pub fn from_ordering(st: &SymbTable<'_, 'a>, order: &NodeList<'a>) -> Self {
        let mut groups = Self::new();
        for name in order.iter() {
            if groups.group_of(name).is_some() {
                continue;
            }
            if !st.is_var(name) {
                st.sess()
                    .dcx()
                    .warn("unknown variable in ordering")
                    .line(name.line())
                    .expr(name)
                    .emit();
                continue;
            }
            if !st.tcx().normalize(st.var_type(name)).is_boolean() {
                st.sess()
                    .dcx()
                    .warn("variable in ordering is not boolean")
                    .line(name.line())
                    .expr(name)
                    .emit();
                continue;
            }
            let gid = groups.create_group();
            groups.add_variable(name, gid);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smv_ast::{Arena, Ast};

    #[test]
    fn groups_are_disjoint() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let mut groups = OrdGroups::new();
        let g0 = groups.create_group();
        let g1 = groups.create_group();
        let a = ast.atom("a");
        let b = ast.atom("b");
        groups.add_variable(a, g0);
        groups.add_variable(b, g1);
        // Idempotent on the same group.
        groups.add_variable(a, g0);
        assert_eq!(groups.size(), 2);
        assert_eq!(groups.group_of(a), Some(g0));
        assert_eq!(groups.group_of(b), Some(g1));
        assert_eq!(groups.vars_in_group(g0), &[a]);
    }

    #[test]
    #[should_panic = "already in group"]
    fn conflicting_reassignment_is_fatal() {
        let arena = Arena::new();
        let ast = Ast::new(&arena);
        let mut groups = OrdGroups::new();
        let g0 = groups.create_group();
        let g1 = groups.create_group();
        let a = ast.atom("a");
        groups.add_variable(a, g0);
        groups.add_variable(a, g1);
    }
}
