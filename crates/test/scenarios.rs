use std::sync::Arc;
use std::time::{Duration, Instant};

use libtest_mimic::{Arguments, Failed, Trial};
use pulse_core::platform::stub::{InjectedClick, StubPlatform};
use pulse_core::{ClickKind, ConfigError, IntervalConfig, Point, RunPlan, SafetyConfig};
use pulse_test::{capture, ensure, scheduler, solid, wait_until};

fn main() {
    let args = Arguments::from_args();
    let trials = vec![
        Trial::test("captured_run_clicks_then_rests", captured_run_clicks_then_rests),
        Trial::test("matching_region_never_skips", matching_region_never_skips),
        Trial::test("changed_region_always_skips", changed_region_always_skips),
        Trial::test("stop_lands_within_a_tick", stop_lands_within_a_tick),
        Trial::test("rejected_plans_leave_scheduler_idle", rejected_plans_leave_scheduler_idle),
    ];
    libtest_mimic::run(&args, trials).exit();
}

fn plan(click: Point, interval: IntervalConfig) -> RunPlan {
    RunPlan {
        click_point: click,
        click_kind: ClickKind::Left,
        interval,
        safety: SafetyConfig::default(),
        capture: None,
    }
}

fn captured_run_clicks_then_rests() -> Result<(), Failed> {
    let stub = Arc::new(StubPlatform::new());
    let result = capture(&stub, Point::new(100, 100), (Point::new(50, 50), Point::new(250, 150)), Point::new(10, 10))?;
    ensure(result.region.width == 200 && result.region.height == 100, format!("region {}", result.region))?;

    let (mut sched, rx) = scheduler(&stub);
    sched.start(RunPlan::from_capture(Arc::new(result), ClickKind::Left, IntervalConfig::fixed(2), SafetyConfig::default()))?;
    let done = wait_until(Duration::from_secs(3), || stub.clicks().len() >= 4);
    sched.stop();
    ensure(done, "second cycle never ran")?;

    let clicks = stub.clicks();
    ensure(
        clicks[..2] == [InjectedClick::Action(Point::new(100, 100), ClickKind::Left), InjectedClick::Rest(Point::new(10, 10))],
        format!("unexpected clicks {:?}", clicks),
    )?;

    let statuses: Vec<_> = rx.try_iter().collect();
    ensure(statuses.len() >= 4, "too few status updates")?;
    ensure(statuses[0].running && statuses[0].click_count == 0, "start should publish a fresh snapshot")?;
    ensure(statuses[1].click_count == 1, "first cycle should report one click")?;
    let countdown: Vec<u64> = statuses[2..4].iter().map(|s| s.seconds_remaining).collect();
    ensure(countdown == [2, 1], format!("countdown {:?}", countdown))?;
    ensure(statuses.last().is_some_and(|s| !s.running), "last update should be stopped")?;
    Ok(())
}

fn matching_region_never_skips() -> Result<(), Failed> {
    let stub = Arc::new(StubPlatform::new());
    let result = capture(&stub, Point::new(300, 300), (Point::new(0, 0), Point::new(40, 40)), Point::new(600, 600))?;

    let (mut sched, _rx) = scheduler(&stub);
    let safety = SafetyConfig { enabled: true, threshold_percent: 95.0 };
    sched.start(RunPlan::from_capture(Arc::new(result), ClickKind::Right, IntervalConfig::fixed(1), safety))?;
    let done = wait_until(Duration::from_secs(3), || sched.status().click_count >= 3);
    sched.stop();
    ensure(done, "clicks did not accumulate")?;

    let status = sched.status();
    ensure(status.skipped_count == 0, format!("skipped {}", status.skipped_count))?;
    ensure(status.last_similarity.is_some_and(|s| s > 99.9), "identical region should score 100")?;
    Ok(())
}

fn changed_region_always_skips() -> Result<(), Failed> {
    let stub = Arc::new(StubPlatform::with_screen(solid(800, 600, [0, 0, 0])));
    let result = capture(&stub, Point::new(300, 300), (Point::new(10, 10), Point::new(60, 60)), Point::new(500, 500))?;
    stub.set_region_frame(Some(solid(50, 50, [255, 255, 255])));

    let (mut sched, _rx) = scheduler(&stub);
    let safety = SafetyConfig { enabled: true, threshold_percent: 50.0 };
    sched.start(RunPlan::from_capture(Arc::new(result), ClickKind::Left, IntervalConfig::fixed(1), safety))?;
    let done = wait_until(Duration::from_secs(3), || sched.status().skipped_count >= 3);
    sched.stop();
    ensure(done, "skips did not accumulate")?;

    ensure(stub.clicks().is_empty(), "a blocked run must not click")?;
    let status = sched.status();
    ensure(status.click_count == 0, "click count moved")?;
    ensure(status.last_similarity == Some(0.0), format!("similarity {:?}", status.last_similarity))?;
    Ok(())
}

fn stop_lands_within_a_tick() -> Result<(), Failed> {
    let stub = Arc::new(StubPlatform::new());
    let (mut sched, rx) = scheduler(&stub);
    sched.start(plan(Point::new(5, 5), IntervalConfig::fixed(3600)))?;
    ensure(wait_until(Duration::from_secs(2), || stub.clicks().len() == 1), "first click missing")?;

    let t0 = Instant::now();
    sched.stop();
    ensure(t0.elapsed() < Duration::from_millis(500), format!("stop took {:?}", t0.elapsed()))?;
    ensure(!sched.is_running(), "still running")?;
    ensure(rx.try_iter().last().is_some_and(|s| !s.running), "no stopped snapshot")?;
    ensure(stub.clicks().len() == 1, "clicked after stop")?;
    Ok(())
}

fn rejected_plans_leave_scheduler_idle() -> Result<(), Failed> {
    let stub = Arc::new(StubPlatform::with_screen(solid(640, 480, [20, 20, 20])));
    let (mut sched, _rx) = scheduler(&stub);

    let cases = [
        (plan(Point::new(5, 5), IntervalConfig::fixed(0)), ConfigError::IntervalTooShort(0)),
        (
            plan(Point::new(5, 5), IntervalConfig::random(10, 5)),
            ConfigError::InvertedRandomBounds { min: 10, max: 5 },
        ),
        (
            plan(Point::new(700, 5), IntervalConfig::fixed(1)),
            ConfigError::PointOutOfBounds { what: "click", point: Point::new(700, 5), width: 640, height: 480 },
        ),
    ];
    for (p, expected) in cases {
        match sched.start(p) {
            Err(e) if e == expected => {}
            other => return Err(format!("expected {:?}, got {:?}", expected, other).into()),
        }
        ensure(!sched.is_running(), "rejected plan started a run")?;
    }
    ensure(stub.clicks().is_empty(), "rejected plan clicked")?;
    Ok(())
}
