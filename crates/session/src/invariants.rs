//! Invariant catalog for [`crate::CardSession`].
#![allow(dead_code)]

/// Must allow at most one mode transition in flight; a second start is rejected, not queued.
///
/// - Enforced in: [`crate::transition::ModeTransitionMachine::start_transition`], [`crate::CardSession::toggle`]
/// - Tested by: `transition::tests::second_start_is_rejected_without_state_change`, `session::tests::concurrent_toggle_is_rejected`
/// - Failure symptom: Two switches interleave and the editor ends up bound to the wrong card.
pub(crate) const SINGLE_TRANSITION_IN_FLIGHT: () = ();

/// Must cancel both autosave timers once a transition starts, before any new timer for either channel can be scheduled.
///
/// - Enforced in: [`crate::autosave::AutosaveScheduler::suspend`] via [`crate::CardSession::toggle`] and [`crate::CardSession::start_transition`]
/// - Tested by: `autosave::tests::suspend_keeps_queued_content_for_flush`, `session::tests::toggle_flushes_pending_edit_before_switching`
/// - Failure symptom: A timer from the old mode fires after the switch and overwrites the other card.
pub(crate) const TIMERS_CANCELLED_ON_SWITCH: () = ();

/// Must capture target card ids and content when a save is scheduled or a flush starts, never re-read them at fire time.
///
/// - Enforced in: [`crate::autosave::SaveRequest::new`], [`crate::autosave::AutosaveScheduler::force_flush`]
/// - Tested by: `autosave::tests::force_flush_waits_for_both_channels_concurrently`, `autosave::tests::live_request_supersedes_queued_content`
/// - Failure symptom: Regular edits land on the solution card after a switch completes mid-flush.
pub(crate) const SAVES_CAPTURE_TARGET_AT_SCHEDULE: () = ();

/// Must not pull card content into the editor while a transition is in flight.
///
/// - Enforced in: [`crate::content_sync::ContentSynchronizer::decide`]
/// - Tested by: `content_sync::tests::transitioning_and_missing_entity_block_sync`, `session::tests::pending_sync_is_dropped_by_toggle`
/// - Failure symptom: The outgoing card's content reappears in the editor after the switch.
pub(crate) const NO_SYNC_WHILE_TRANSITIONING: () = ();

/// Must resolve every explicit save to exactly one target matching the current mode.
///
/// - Enforced in: [`crate::force_save::validate_save_target`]
/// - Tested by: `force_save::tests::prop_single_target`
/// - Failure symptom: One edit is written to both cards, or to the card the user is not looking at.
pub(crate) const SINGLE_SAVE_TARGET: () = ();

/// Must reject editor updates while a transition is in flight.
///
/// - Enforced in: [`crate::transition::ModeTransitionMachine::update_editor_state`]
/// - Tested by: `transition::tests::edits_during_transition_are_rejected`, `session::tests::edits_during_toggle_are_rejected`
/// - Failure symptom: Keystrokes typed mid-switch are saved into the incoming card.
pub(crate) const NO_EDITS_WHILE_TRANSITIONING: () = ();

/// Must restore the pre-transition mode and editor content when a started transition fails.
///
/// - Enforced in: [`crate::transition::ModeTransitionMachine::handle_transition_error`]
/// - Tested by: `transition::tests::error_rolls_back_to_pre_transition_snapshot`, `session::tests::failed_flush_rolls_back_toggle`
/// - Failure symptom: The mode flips without the target card being loaded, or the user's unsaved text disappears.
pub(crate) const ROLLBACK_ON_TRANSITION_FAILURE: () = ();

/// Must only replace the last valid snapshot with a state that validated without errors.
///
/// - Enforced in: [`crate::consistency::ConsistencyGuard::capture_valid_state`]
/// - Tested by: `consistency::tests::capture_only_replaces_snapshot_when_valid`
/// - Failure symptom: Recovery restores a state that was already broken.
pub(crate) const SNAPSHOT_ONLY_WHEN_VALID: () = ();

/// Must never replace editor content that differs from what is stored for the card it is bound to.
///
/// - Enforced in: `Shared::pull_active`, `Shared::flush_unsaved` via [`crate::CardSession::load`], [`crate::CardSession::set_regular_card`], [`crate::CardSession::refresh_from_store`]
/// - Tested by: `session::tests::edit_after_refresh_survives_the_pull`, `session::tests::load_flushes_unsaved_edit_before_reading`, `session::tests::load_keeps_edit_when_flush_fails`
/// - Failure symptom: A reload or debounced pull silently reverts text the user just typed.
pub(crate) const NO_PULL_OVER_UNSAVED_EDITS: () = ();

/// Must reject edits while the editor is not bound to the authoritative card.
///
/// - Enforced in: [`crate::CardSession::update_code`], [`crate::CardSession::update_notes`]
/// - Tested by: `session::tests::edits_wait_for_rebound_card_pull`
/// - Failure symptom: An edit reports as applied but reaches neither the old nor the new card.
pub(crate) const NO_EDITS_WHILE_UNBOUND: () = ();
