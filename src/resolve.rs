//! Talkgroup name → contact linkage.
//!
//! Channel files name their talkgroup as free text. The resolver matches
//! that text against known contacts and, for unknown names, creates a
//! placeholder Group contact with a negative DMR ID so the channel still
//! has something to point at. Real IDs are never negative, so placeholders
//! cannot collide with a later talkgroup import.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{CallType, Channel, Contact};

/// Outcome of one `resolve` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    /// Channels linked to an already known contact
    pub linked: usize,
    /// Placeholder contacts created
    pub created: usize,
}

/// Name index over contacts plus the next free placeholder ID.
#[derive(Debug, Clone)]
pub struct ContactResolver {
    by_name: HashMap<String, i64>,
    lowest_dmr_id: i64,
}

fn fold(name: &str) -> String {
    name.trim().to_uppercase()
}

impl ContactResolver {
    /// Index existing contacts by folded name.
    ///
    /// When two contacts share a name, the Group contact wins, then the
    /// first one listed.
    #[must_use]
    pub fn new(existing: &[Contact]) -> Self {
        let mut by_name = HashMap::with_capacity(existing.len());
        let groups = existing.iter().filter(|c| c.call_type == CallType::Group);
        let others = existing.iter().filter(|c| c.call_type != CallType::Group);
        for contact in groups.chain(others) {
            by_name.entry(fold(&contact.name)).or_insert(contact.id);
        }
        let lowest_dmr_id = existing.iter().map(|c| c.dmr_id).min().unwrap_or(0).min(0);
        Self {
            by_name,
            lowest_dmr_id,
        }
    }

    /// Contact id for a talkgroup name, if known.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.by_name.get(&fold(name)).copied()
    }

    /// Link every channel that names a talkgroup.
    ///
    /// Unknown names get a placeholder contact persisted through `insert`,
    /// which returns the new row id. The placeholder is indexed right away,
    /// so a name repeated across the batch creates one contact. Channels are
    /// only updated in memory; saving them is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns the first error from `insert`.
    pub fn resolve<F>(&mut self, channels: &mut [Channel], mut insert: F) -> Result<ResolveStats>
    where
        F: FnMut(&Contact) -> Result<i64>,
    {
        let mut stats = ResolveStats::default();

        for channel in channels.iter_mut() {
            let Some(name) = channel.tx_contact.as_deref().map(str::trim) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            if let Some(id) = self.lookup(name) {
                channel.contact_id = Some(id);
                stats.linked += 1;
                continue;
            }

            self.lowest_dmr_id -= 1;
            let mut placeholder = Contact::new(self.lowest_dmr_id, name, CallType::Group);
            placeholder.id = insert(&placeholder)?;
            debug!(
                name,
                dmr_id = placeholder.dmr_id,
                id = placeholder.id,
                "Created placeholder contact"
            );
            self.by_name.insert(fold(name), placeholder.id);
            channel.contact_id = Some(placeholder.id);
            stats.created += 1;
        }

        if stats.created > 0 {
            info!(
                linked = stats.linked,
                created = stats.created,
                "Resolved channel contacts"
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: i64, dmr_id: i64, name: &str) -> Contact {
        Contact {
            id,
            dmr_id,
            name: name.to_string(),
            call_type: CallType::Group,
        }
    }

    fn channel(name: &str, tg: Option<&str>) -> Channel {
        let mut ch = Channel::new(name, 441.0, 446.0);
        ch.tx_contact = tg.map(ToString::to_string);
        ch
    }

    #[test]
    fn test_links_known_names_case_insensitively() {
        let mut resolver = ContactResolver::new(&[contact(7, 91, "Worldwide")]);
        let mut channels = vec![channel("A", Some("  worldwide ")), channel("B", None)];

        let stats = resolver
            .resolve(&mut channels, |_| panic!("no insert expected"))
            .unwrap();

        assert_eq!(stats, ResolveStats { linked: 1, created: 0 });
        assert_eq!(channels[0].contact_id, Some(7));
        assert_eq!(channels[1].contact_id, None);
    }

    #[test]
    fn test_one_placeholder_per_unseen_name() {
        let mut resolver = ContactResolver::new(&[contact(1, 91, "Worldwide")]);
        let mut channels = vec![
            channel("A", Some("Local 9")),
            channel("B", Some("LOCAL 9")),
            channel("C", Some("Regional")),
        ];

        let mut inserted = Vec::new();
        let mut next_id = 100;
        let stats = resolver
            .resolve(&mut channels, |c| {
                inserted.push(c.clone());
                next_id += 1;
                Ok(next_id)
            })
            .unwrap();

        assert_eq!(stats.created, 2);
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[0].dmr_id, -1);
        assert_eq!(inserted[1].dmr_id, -2);
        assert!(inserted.iter().all(Contact::is_placeholder));
        assert_eq!(channels[0].contact_id, channels[1].contact_id);
        assert_ne!(channels[0].contact_id, channels[2].contact_id);
    }

    #[test]
    fn test_placeholders_continue_below_existing_ones() {
        let mut resolver = ContactResolver::new(&[contact(1, -5, "Old placeholder")]);
        let mut channels = vec![channel("A", Some("New"))];
        let mut dmr_ids = Vec::new();
        resolver
            .resolve(&mut channels, |c| {
                dmr_ids.push(c.dmr_id);
                Ok(2)
            })
            .unwrap();
        assert_eq!(dmr_ids, vec![-6]);
    }

    #[test]
    fn test_insert_failure_propagates() {
        let mut resolver = ContactResolver::new(&[]);
        let mut channels = vec![channel("A", Some("X"))];
        let result = resolver.resolve(&mut channels, |_| {
            Err(crate::error::Error::Other("disk full".into()))
        });
        assert!(result.is_err());
        assert_eq!(channels[0].contact_id, None);
    }
}
