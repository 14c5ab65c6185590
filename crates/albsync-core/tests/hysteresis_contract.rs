//! Contract test: cautious deregistration across invocations
//!
//! Drives the engine through sequences of invocations against shared
//! doubles, the way the scheduled trigger drives production: each
//! invocation only sees what the snapshot store carried over.

mod common;

use common::*;

#[tokio::test]
async fn ip_is_deregistered_after_three_consecutive_absences() {
    let prober = ScriptedProber::new(ip_set(&["10.0.0.1", "10.0.0.2"]));
    let target_group = MockTargetGroup::new();
    let store = CountingStore::new();
    let metrics = RecordingMetrics::new();
    let config = test_config(3);

    // Invocation 1: first run, both IPs are registered aggressively.
    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();
    assert_eq!(target_group.membership(), ip_set(&["10.0.0.1", "10.0.0.2"]));
    assert!(store.pending(LB).await.unwrap().is_empty());

    // The snapshot written is the raw DNS truth, read back unchanged.
    let snapshot = store.snapshot(LB).await.unwrap();
    assert_eq!(snapshot.ip_list, ip_set(&["10.0.0.1", "10.0.0.2"]));
    assert_eq!(snapshot.ip_count, 2);

    // ip2 drops out of DNS.
    prober.set_answer(ip_set(&["10.0.0.1"]));

    // Invocation 2: first absence, counter starts at 1, nothing deregistered.
    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();
    assert_eq!(store.pending(LB).await.unwrap().count(&ip("10.0.0.2")), Some(1));
    assert!(target_group.deregistered_ips().is_empty());

    // Invocation 3: second absence.
    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();
    assert_eq!(store.pending(LB).await.unwrap().count(&ip("10.0.0.2")), Some(2));
    assert!(target_group.deregistered_ips().is_empty());

    // Invocation 4: counter reaches the threshold, ip2 is deregistered and
    // its ledger entry is consumed.
    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();
    assert_eq!(target_group.membership(), ip_set(&["10.0.0.1"]));
    assert!(store.pending(LB).await.unwrap().is_empty());

    // Invocation 5: converged, nothing further happens.
    run_invocation(&prober, &target_group, &store, &metrics, config)
        .await
        .unwrap();
    assert_eq!(
        target_group.deregistered_ips().len(),
        1,
        "a sustained-absence episode deregisters exactly once"
    );

    // The gauge tracked |D| each completed invocation.
    assert_eq!(metrics.published(), vec![2, 1, 1, 1, 1]);
}

#[tokio::test]
async fn threshold_crossing_ips_reach_the_deregister_call() {
    // Regression guard: the IPs selected by the threshold filter must be
    // the ones actually handed to the control plane, port included.
    let prober = ScriptedProber::new(ip_set(&["10.0.0.1", "10.0.0.2"]));
    let target_group = MockTargetGroup::new();
    let store = CountingStore::new();
    let metrics = RecordingMetrics::new();
    let config = test_config(1);

    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();

    prober.set_answer(ip_set(&["10.0.0.1"]));
    run_invocation(&prober, &target_group, &store, &metrics, config)
        .await
        .unwrap();

    let deregistered = target_group.deregistered_ips();
    assert_eq!(deregistered.len(), 1);
    assert_eq!(deregistered[0].id, ip("10.0.0.2"));
    assert_eq!(deregistered[0].port, PORT);
}

#[tokio::test]
async fn reappearing_ip_drops_its_counter_and_is_reregistered() {
    let prober = ScriptedProber::new(ip_set(&["10.0.0.1", "10.0.0.2"]));
    let target_group = MockTargetGroup::new();
    let store = CountingStore::new();
    let metrics = RecordingMetrics::new();
    let config = test_config(3);

    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();

    // One absent invocation puts ip2 on the ledger.
    prober.set_answer(ip_set(&["10.0.0.1"]));
    run_invocation(&prober, &target_group, &store, &metrics, config.clone())
        .await
        .unwrap();
    assert_eq!(store.pending(LB).await.unwrap().count(&ip("10.0.0.2")), Some(1));

    // ip2 comes back: the entry is deleted, not decremented, and ip2 is
    // re-registered because it was absent from the just-prior snapshot.
    prober.set_answer(ip_set(&["10.0.0.1", "10.0.0.2"]));
    let registrations_before = target_group.registered_ips().len();
    run_invocation(&prober, &target_group, &store, &metrics, config)
        .await
        .unwrap();

    assert!(store.pending(LB).await.unwrap().is_empty());
    assert!(target_group.deregistered_ips().is_empty());
    let new_registrations: Vec<_> = target_group.registered_ips()[registrations_before..].to_vec();
    assert!(new_registrations.iter().any(|t| t.id == ip("10.0.0.2")));
}
