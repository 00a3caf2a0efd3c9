//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet, HashMap};

use generational_arena::{Arena, Index};
use ipnetwork::IpNetwork;

#[derive(Debug)]
pub struct Interface {
    pub name: String,
    pub ifindex: u32,
    pub addresses: BTreeSet<IpNetwork>,
}

#[derive(Debug, Default)]
pub struct Interfaces {
    // Interface arena.
    arena: Arena<Interface>,
    // Interface binary tree keyed by name.
    name_tree: BTreeMap<String, Index>,
    // Interface hash table keyed by ifindex.
    ifindex_tree: HashMap<u32, Index>,
}

// ===== impl Interfaces =====

impl Interfaces {
    // Adds or updates the interface with the specified attributes.
    pub(crate) fn update(&mut self, ifname: String, ifindex: u32) {
        match self.ifindex_tree.get(&ifindex).copied() {
            Some(iface_idx) => {
                let iface = &mut self.arena[iface_idx];

                // Update the existing interface with the new information.
                if iface.name != ifname {
                    self.name_tree.remove(&iface.name);
                    iface.name.clone_from(&ifname);
                    self.name_tree.insert(ifname, iface_idx);
                }
            }
            None => {
                // A renumbered interface keeps its name but gets a new index.
                if let Some(iface_idx) = self.name_tree.get(&ifname).copied() {
                    let iface = &mut self.arena[iface_idx];
                    self.ifindex_tree.remove(&iface.ifindex);
                    iface.ifindex = ifindex;
                    self.ifindex_tree.insert(ifindex, iface_idx);
                    return;
                }

                // If the interface does not exist, create a new entry.
                let iface = Interface {
                    name: ifname.clone(),
                    ifindex,
                    addresses: Default::default(),
                };
                let iface_idx = self.arena.insert(iface);
                self.name_tree.insert(ifname, iface_idx);
                self.ifindex_tree.insert(ifindex, iface_idx);
            }
        }
    }

    // Removes the specified interface identified by its name.
    pub(crate) fn remove(&mut self, ifname: &str) -> Option<Interface> {
        let iface_idx = self.name_tree.get(ifname).copied()?;
        let iface = &self.arena[iface_idx];

        // Remove interface.
        self.name_tree.remove(&iface.name);
        self.ifindex_tree.remove(&iface.ifindex);
        self.arena.remove(iface_idx)
    }

    // Returns a reference to the interface corresponding to the given name.
    pub fn get_by_name(&self, ifname: &str) -> Option<&Interface> {
        self.name_tree
            .get(ifname)
            .copied()
            .map(|iface_idx| &self.arena[iface_idx])
    }

    // Returns a mutable reference to the interface corresponding to the given
    // name.
    pub(crate) fn get_mut_by_name(
        &mut self,
        ifname: &str,
    ) -> Option<&mut Interface> {
        self.name_tree
            .get(ifname)
            .copied()
            .map(move |iface_idx| &mut self.arena[iface_idx])
    }

    // Returns a reference to the interface corresponding to the given ifindex.
    pub fn get_by_ifindex(&self, ifindex: u32) -> Option<&Interface> {
        self.ifindex_tree
            .get(&ifindex)
            .copied()
            .map(|iface_idx| &self.arena[iface_idx])
    }

    // Returns the name of the interface with the given ifindex.
    pub fn ifname(&self, ifindex: u32) -> Option<&str> {
        self.get_by_ifindex(ifindex).map(|iface| iface.name.as_str())
    }

    // Returns an iterator visiting all interfaces.
    //
    // Interfaces are ordered by their names.
    pub fn iter(&self) -> impl Iterator<Item = &'_ Interface> + '_ {
        self.name_tree
            .values()
            .map(|iface_idx| &self.arena[*iface_idx])
    }
}
