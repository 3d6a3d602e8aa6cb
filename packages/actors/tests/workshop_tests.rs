mod common;

use std::error::Error;
use std::time::Duration;

use garage_actors::{EngineError, EventLog, SilentFormatter, Workshop};
use garage_core::{
    CategoryMix, ConfigError, FixedGenerator, IssueCategory, JobId, MixGenerator, Phase, Priority,
    RandomGenerator,
};
use tokio_util::sync::CancellationToken;

use common::{UNIT, backlog, config, entering_order, events_for, full_lifecycle, job};

#[tokio::test(start_paused = true)]
async fn test_single_slot_admits_by_priority() -> Result<(), Box<dyn Error>> {
    let log = EventLog::new();
    let workshop = Workshop::new(config(3, 1, 1))?;
    let mut generator = FixedGenerator::new(vec![
        job(0, IssueCategory::Bodywork),
        job(0, IssueCategory::Mechanical),
        job(0, IssueCategory::Electrical),
    ]);
    let report = workshop.run(&mut generator, log.formatter()).await?;

    assert!(report.all_completed());
    assert_eq!(
        entering_order(&log.events(), Phase::Documentation),
        vec![JobId(1), JobId(2), JobId(0)]
    );
    assert_eq!(report.peak_in_service, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_default_workshop_completes_every_job() -> Result<(), Box<dyn Error>> {
    let log = EventLog::new();
    let workshop = Workshop::new(config(20, 10, 4))?;
    let registry = workshop.registry();
    let gate = workshop.gate();
    let tracker = workshop.tracker();

    let mut generator = RandomGenerator::seeded(42, UNIT);
    let report = workshop.run(&mut generator, log.formatter()).await?;

    assert_eq!(report.admitted, 20);
    assert_eq!(report.completed, 20);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.events_emitted, 160);
    assert_eq!(log.len(), 160);
    for phase in Phase::ALL {
        assert_eq!(report.jobs_per_phase.get(&phase), Some(&20));
    }
    let by_priority: u64 = report.completed_by_priority.values().sum();
    assert_eq!(by_priority, 20);

    assert!(registry.is_empty());
    assert_eq!(gate.available(), 10);
    assert_eq!(tracker.in_flight(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_every_job_enters_each_phase_exactly_once_in_order() -> Result<(), Box<dyn Error>> {
    let log = EventLog::new();
    let workshop = Workshop::new(config(25, 6, 2))?;
    let mut generator = RandomGenerator::seeded(3, UNIT);
    workshop.run(&mut generator, log.formatter()).await?;

    let events = log.events();
    for id in 0..25 {
        assert_eq!(events_for(&events, JobId(id)), full_lifecycle(), "job {}", id);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_garage_never_holds_more_cars_than_slots() -> Result<(), Box<dyn Error>> {
    let slots = 3;
    let workshop = Workshop::new(config(30, slots, 2))?;
    let registry = workshop.registry();
    let gate = workshop.gate();

    let done = CancellationToken::new();
    let observer = {
        let done = done.clone();
        tokio::spawn(async move {
            let mut most = 0;
            while !done.is_cancelled() {
                let snapshot = registry.snapshot();
                most = most.max(snapshot.len());
                assert!(gate.in_use() <= slots);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            most
        })
    };

    let mut generator = RandomGenerator::seeded(11, UNIT);
    let report = workshop.run(&mut generator, SilentFormatter).await?;
    done.cancel();
    let most_observed = observer.await?;

    assert!(report.all_completed());
    assert!(report.peak_in_service <= slots);
    assert!(most_observed <= slots);
    assert!(most_observed > 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_bench_mixes_complete_with_matching_priority_counts() -> Result<(), Box<dyn Error>> {
    for (mechanical, electrical, bodywork) in [(10, 10, 10), (20, 5, 5), (5, 5, 20)] {
        let mix = CategoryMix::new(mechanical, electrical, bodywork);
        let workshop = Workshop::new(config(mix.total(), 10, 4))?;
        let mut generator = MixGenerator::new(mix, UNIT, Some(5));
        let report = workshop.run(&mut generator, SilentFormatter).await?;

        assert!(report.all_completed(), "mix {:?}", mix);
        assert_eq!(report.completed_by_priority.get(&Priority::High), Some(&(mechanical as u64)));
        assert_eq!(report.completed_by_priority.get(&Priority::Medium), Some(&(electrical as u64)));
        assert_eq!(report.completed_by_priority.get(&Priority::Low), Some(&(bodywork as u64)));
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_delivery_handover_holds_the_slot() -> Result<(), Box<dyn Error>> {
    let with_handover = Workshop::new(config(1, 1, 1))?
        .run_backlog(backlog(&[IssueCategory::Bodywork]), SilentFormatter)
        .await?;
    let without_handover = Workshop::new(config(1, 1, 1).with_delivery_handover(false))?
        .run_backlog(backlog(&[IssueCategory::Bodywork]), SilentFormatter)
        .await?;

    assert!(with_handover.elapsed >= UNIT * 5);
    assert!(without_handover.elapsed >= UNIT * 4);
    assert!(without_handover.elapsed < UNIT * 5);
    Ok(())
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    assert!(matches!(
        Workshop::new(config(5, 0, 4)),
        Err(EngineError::Config(ConfigError::NoSlots))
    ));
    assert!(matches!(
        Workshop::new(config(5, 2, 0)),
        Err(EngineError::Config(ConfigError::NoSpecializedWorkers))
    ));
    assert!(matches!(
        Workshop::new(config(5, 2, 2).with_pool_size(Phase::Cleaning, 0)),
        Err(EngineError::Config(ConfigError::EmptyPool(Phase::Cleaning)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_closed_gate_drains_admitted_jobs_before_returning() -> Result<(), Box<dyn Error>> {
    let log = EventLog::new();
    let workshop = Workshop::new(config(10, 2, 1))?;
    let registry = workshop.registry();
    let gate = workshop.gate();
    let tracker = workshop.tracker();

    let closer = {
        let gate = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(UNIT * 3).await;
            gate.close();
        })
    };

    let mut generator = RandomGenerator::seeded(9, UNIT);
    let result = workshop.run(&mut generator, log.formatter()).await;
    closer.await?;
    assert!(matches!(result, Err(EngineError::GateClosed)));

    let events_at_return = log.len();
    assert!(registry.is_empty());
    assert_eq!(tracker.in_flight(), 0);
    assert_eq!(tracker.abandoned(), 0);
    assert_eq!(tracker.completed(), tracker.admitted());
    assert_eq!(events_at_return as u64, tracker.admitted() * 8);

    tokio::time::sleep(UNIT * 200).await;
    assert_eq!(log.len(), events_at_return);
    assert!(registry.is_empty());
    Ok(())
}
