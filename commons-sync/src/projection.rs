//! Mapping between live state and the side aggregates persisted for it.
//!
//! RSVPs and verification outcomes are stored apart from the entities they
//! annotate. On load they are projected onto whatever fresh entities match by
//! id; on save they are read back off the state.

use std::collections::BTreeSet;

use commons_core::{AppState, RsvpSet, Timestamp, VerificationFlags};

/// Mark the owner as attending every fresh event named in `rsvps`.
///
/// Returns how many ids matched no fresh event. Those are left alone.
pub fn project_rsvps(state: &mut AppState, rsvps: &RsvpSet) -> usize {
    let mut matched = 0;
    for event in &mut state.events {
        if rsvps.event_ids.contains(&event.id) {
            matched += 1;
            event.is_attending = true;
            if !event.has_rsvp(&rsvps.user_id) {
                event.rsvp_list.push(rsvps.user_id.clone());
            }
        }
    }
    rsvps.event_ids.len().saturating_sub(matched)
}

/// Apply persisted verification outcomes to the user and matching NGOs.
///
/// Returns how many NGO ids matched no fresh NGO.
pub fn project_verification(state: &mut AppState, flags: &VerificationFlags) -> usize {
    if let Some(user) = state.user.as_mut().filter(|u| u.id == flags.user_id) {
        user.identity_verified |= flags.identity_verified;
    }
    let mut matched = 0;
    for ngo in &mut state.ngos {
        if flags.verified_ngo_ids.contains(&ngo.id) {
            matched += 1;
            ngo.verified = true;
        }
    }
    flags.verified_ngo_ids.len().saturating_sub(matched)
}

/// The active user's RSVP set as it stands in `state`.
pub fn snapshot_rsvps(state: &AppState, at: Timestamp) -> Option<RsvpSet> {
    let user_id = state.active_user_id()?;
    let event_ids: BTreeSet<_> = state
        .events
        .iter()
        .filter(|e| e.is_attending)
        .map(|e| e.id.clone())
        .collect();
    Some(RsvpSet {
        user_id: user_id.clone(),
        event_ids,
        updated_at: Some(at),
    })
}

/// The active user's verification flags as they stand in `state`.
pub fn snapshot_verification(state: &AppState, at: Timestamp) -> Option<VerificationFlags> {
    let user = state.user.as_ref()?;
    Some(VerificationFlags {
        user_id: user.id.clone(),
        identity_verified: user.identity_verified,
        verified_ngo_ids: state
            .ngos
            .iter()
            .filter(|n| n.verified)
            .map(|n| n.id.clone())
            .collect(),
        verified_at: Some(at),
    })
}
