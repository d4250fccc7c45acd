// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Registry Service
//!
//! The registry driven through a real store must append exactly what the
//! pure handlers decide, no matter which backend holds the log.

use proptest::prelude::*;
use std::sync::Arc;

use cim_instance_registry::aggregate::{InstanceAggregate, RegistrationPolicy};
use cim_instance_registry::config::RetryPolicy;
use cim_instance_registry::domain::InstanceId;
use cim_instance_registry::event_store::{EventLogStore, InMemoryEventLogStore, SerializedEventLogStore};
use cim_instance_registry::events::InstanceEvent;
use cim_instance_registry::service::InstanceRegistry;

use super::fold_properties::{build_log, command_strategy, policy_strategy, registration, Command};

fn run(store: Arc<dyn EventLogStore>, commands: &[Command], policy: RegistrationPolicy) -> Vec<&'static str> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let registry = InstanceRegistry::new(store.clone())
            .with_retry(RetryPolicy::immediate(3))
            .with_registration_policy(policy);
        let id = InstanceId::new("abc");

        for command in commands {
            // Rejected commands are part of the model too; ignore the error
            let _ = match command {
                Command::Register { name, dummy } => registry
                    .register(id.clone(), registration(*name, *dummy))
                    .await
                    .map(|_| ()),
                Command::Status(status) => registry.report_status(&id, *status).await.map(|_| ()),
                Command::Deregister => registry.deregister(&id).await.map(|_| ()),
            };
        }

        let log = store.get(&id).await.unwrap();
        assert!(log.verify_versions().is_ok());
        log.iter().map(InstanceEvent::event_type_name).collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The registry appends the same event sequence as the pure model
    #[test]
    fn prop_registry_matches_handler_model(
        commands in prop::collection::vec(command_strategy(), 0..25),
        policy in policy_strategy(),
    ) {
        let model: Vec<&'static str> = build_log(&commands, policy)
            .iter()
            .map(InstanceEvent::event_type_name)
            .collect();

        prop_assert_eq!(&run(Arc::new(InMemoryEventLogStore::new()), &commands, policy), &model);
        prop_assert_eq!(&run(Arc::new(SerializedEventLogStore::new()), &commands, policy), &model);
    }

    /// Folded state from the store matches the model's folded state
    #[test]
    fn prop_registry_state_matches_model(
        commands in prop::collection::vec(command_strategy(), 0..25),
    ) {
        let policy = RegistrationPolicy::SkipIdentical;
        let store: Arc<dyn EventLogStore> = Arc::new(InMemoryEventLogStore::new());
        run(store.clone(), &commands, policy);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let stored = runtime.block_on(store.get(&InstanceId::new("abc"))).unwrap();

        let id = InstanceId::new("abc");
        let actual = InstanceAggregate::from_events(id.clone(), &stored);
        let expected = InstanceAggregate::from_events(id, &build_log(&commands, policy));

        prop_assert_eq!(actual.version, expected.version);
        prop_assert_eq!(actual.lifecycle, expected.lifecycle);
        prop_assert_eq!(actual.status, expected.status);
        prop_assert_eq!(actual.registration, expected.registration);
    }
}
