// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Instance Fold
//!
//! Random command sequences are pushed through the pure handlers to build
//! event logs, then the fold is checked for determinism, incremental
//! consistency and version contiguity.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use cim_instance_registry::aggregate::{
    apply_event, handle_deregister, handle_register, handle_report_status,
    DeregisterInstanceCommand, InstanceAggregate, Lifecycle, RegisterInstanceCommand,
    RegistrationPolicy, ReportStatusCommand,
};
use cim_instance_registry::domain::{InstanceId, InstanceStatus, Registration};
use cim_instance_registry::events::{EventLog, InstanceEvent};

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
pub(super) enum Command {
    Register { name: u8, dummy: u8 },
    Status(InstanceStatus),
    Deregister,
}

fn status_strategy() -> impl Strategy<Value = InstanceStatus> {
    prop_oneof![
        Just(InstanceStatus::Unknown),
        Just(InstanceStatus::Up),
        Just(InstanceStatus::Down),
        Just(InstanceStatus::Offline),
        Just(InstanceStatus::Restricted),
        Just(InstanceStatus::OutOfService),
    ]
}

pub(super) fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => (0u8..3, 0u8..3).prop_map(|(name, dummy)| Command::Register { name, dummy }),
        4 => status_strategy().prop_map(Command::Status),
        1 => Just(Command::Deregister),
    ]
}

pub(super) fn policy_strategy() -> impl Strategy<Value = RegistrationPolicy> {
    prop_oneof![
        Just(RegistrationPolicy::SkipIdentical),
        Just(RegistrationPolicy::AlwaysAppend),
    ]
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap()
}

pub(super) fn registration(name: u8, dummy: u8) -> Registration {
    Registration::create(format!("service-{}", name), "http://health")
        .metadata("dummy", dummy.to_string())
        .build()
        .unwrap()
}

/// Run commands through the handlers, keeping only accepted events
pub(super) fn build_log(commands: &[Command], policy: RegistrationPolicy) -> EventLog {
    let id = InstanceId::new("abc");
    let mut log = EventLog::new();
    let mut state = InstanceAggregate::empty(id);

    for (i, command) in commands.iter().enumerate() {
        let timestamp = base_time() + Duration::seconds(i as i64);
        let decided = match command {
            Command::Register { name, dummy } => handle_register(
                &state,
                RegisterInstanceCommand {
                    registration: registration(*name, *dummy),
                    timestamp,
                },
                policy,
            ),
            Command::Status(status) => handle_report_status(
                &state,
                ReportStatusCommand {
                    status: *status,
                    timestamp,
                },
            ),
            Command::Deregister => handle_deregister(&state, DeregisterInstanceCommand { timestamp }),
        };

        if let Ok(Some(event)) = decided {
            state = apply_event(state, &event);
            log = log.appended(event);
        }
    }
    log
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Folding the same log twice yields the same aggregate
    #[test]
    fn prop_fold_is_deterministic(
        commands in prop::collection::vec(command_strategy(), 0..40),
        policy in policy_strategy(),
    ) {
        let log = build_log(&commands, policy);
        let id = InstanceId::new("abc");

        prop_assert_eq!(
            InstanceAggregate::from_events(id.clone(), &log),
            InstanceAggregate::from_events(id, &log)
        );
    }

    /// Folding a prefix then applying the rest equals folding everything
    #[test]
    fn prop_fold_is_incremental(
        commands in prop::collection::vec(command_strategy(), 0..40),
        split in 0usize..40,
    ) {
        let log = build_log(&commands, RegistrationPolicy::SkipIdentical);
        let id = InstanceId::new("abc");
        let split = split.min(log.len());

        let (head, tail) = log.events().split_at(split);
        let partial = InstanceAggregate::from_events(id.clone(), &EventLog::from_events(head.to_vec()));
        let resumed = tail.iter().fold(partial, apply_event);

        prop_assert_eq!(resumed, InstanceAggregate::from_events(id, &log));
    }

    /// Handler-produced logs have versions 0..n and the aggregate version is n
    #[test]
    fn prop_versions_are_contiguous(
        commands in prop::collection::vec(command_strategy(), 0..60),
        policy in policy_strategy(),
    ) {
        let log = build_log(&commands, policy);

        prop_assert!(log.verify_versions().is_ok());
        let aggregate = InstanceAggregate::from_events(InstanceId::new("abc"), &log);
        prop_assert_eq!(aggregate.version, log.len() as u64);
        prop_assert_eq!(log.next_version(), log.len() as u64);
    }

    /// A log survives JSON serialization as an equal value
    #[test]
    fn prop_json_round_trip_preserves_equality(
        commands in prop::collection::vec(command_strategy(), 0..30),
    ) {
        let log = build_log(&commands, RegistrationPolicy::AlwaysAppend);
        let json = serde_json::to_vec(&log).unwrap();
        let back: EventLog = serde_json::from_slice(&json).unwrap();

        prop_assert_eq!(back, log);
    }

    /// Deregistered instances report UNKNOWN and keep their last registration
    #[test]
    fn prop_deregistration_resets_status(
        commands in prop::collection::vec(command_strategy(), 1..40),
    ) {
        let log = build_log(&commands, RegistrationPolicy::SkipIdentical);
        let aggregate = InstanceAggregate::from_events(InstanceId::new("abc"), &log);

        if let Some(InstanceEvent::Deregistered(_)) = log.last() {
            prop_assert_eq!(aggregate.lifecycle, Lifecycle::Deregistered);
            prop_assert_eq!(aggregate.status, InstanceStatus::Unknown);
            prop_assert!(aggregate.registration.is_some());
        }
    }

    /// Under SkipIdentical, no RegistrationUpdated repeats the previous registration
    #[test]
    fn prop_skip_identical_never_repeats(
        commands in prop::collection::vec(command_strategy(), 0..40),
    ) {
        let log = build_log(&commands, RegistrationPolicy::SkipIdentical);
        let mut previous: Option<&Registration> = None;

        for event in log.iter() {
            if let InstanceEvent::RegistrationUpdated(updated) = event {
                prop_assert_ne!(Some(&updated.registration), previous);
            }
            if let Some(registration) = event.registration() {
                previous = Some(registration);
            }
        }
    }
}
