use super::{JobContext, ETHEREUM_ROLE_CONSENSUS};
use crate::metrics::{SPEC_VALUE, TERMINAL_TOTAL_DIFFICULTY_TRILLIONS};
use crate::topics::{Event, Topic};
use metrics::{set_float_gauge, set_gauge_vec};
use slog::warn;
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

/// One gauge per scalar field in the spec's raw map, plus the derived
/// terminal-total-difficulty-in-trillions series; refreshed whenever the
/// observer core re-fetches the chain spec (spec.md §4.7 re-fetches it on a
/// 5 minute interval) and republished on the bus as `spec_updated`.
const REFETCH_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub async fn run_spec_job(ctx: Arc<JobContext>, executor: TaskExecutor) {
    let sub_ctx = ctx.clone();
    ctx.bus.subscribe(Topic::SpecUpdated, move |event| {
        if let Event::SpecUpdated(spec) = event {
            record_spec(&sub_ctx, spec);
        }
        Ok(())
    });

    let mut interval = tokio::time::interval(REFETCH_INTERVAL);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => refetch(&ctx).await,
        }
    }
}

async fn refetch(ctx: &JobContext) {
    match ctx.beacon_client.get_config_spec().await {
        Ok(raw) => {
            let spec = slot_clock::Spec::from_raw_map(&raw);
            ctx.bus.publish(Topic::SpecUpdated, Event::SpecUpdated(spec));
        }
        Err(e) => warn!(ctx.log, "spec job: failed to refetch chain spec"; "error" => %e),
    }
}

fn record_spec(ctx: &JobContext, spec: &slot_clock::Spec) {
    for (field, value) in &spec.raw {
        if let Ok(parsed) = value.parse::<i64>() {
            set_gauge_vec(
                &SPEC_VALUE,
                &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, field],
                parsed,
            );
        }
    }

    if let Some(ttd) = &spec.terminal_total_difficulty {
        let trillions = ttd_as_trillions(ttd);
        set_float_gauge(&TERMINAL_TOTAL_DIFFICULTY_TRILLIONS, trillions);
    }
}

/// `ttd / 10^12`, computed in integer arithmetic to the nearest whole
/// trillion and then converted to `f64` — `TERMINAL_TOTAL_DIFFICULTY` values
/// far exceed `f64`'s exact integer range, so dividing as a `BigUint` first
/// avoids losing precision before the value is small enough to matter.
fn ttd_as_trillions(ttd: &num_bigint::BigUint) -> f64 {
    let trillion = num_bigint::BigUint::from(1_000_000_000_000u64);
    let whole = ttd / &trillion;
    let remainder = ttd % &trillion;
    whole.to_string().parse::<f64>().unwrap_or(f64::MAX)
        + (remainder.to_string().parse::<f64>().unwrap_or(0.0) / 1_000_000_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn ttd_conversion_matches_expected_trillions() {
        let ttd = BigUint::parse_bytes(b"58750000000000000000000", 10).unwrap();
        let trillions = ttd_as_trillions(&ttd);
        assert!((trillions - 58_750_000.0).abs() < 1.0);
    }
}
