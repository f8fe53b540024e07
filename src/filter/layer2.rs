//! Layer-2 filter: asynchronous, HTTP-bound rule evaluation over price
//! statistics, with fallback window widening.

use alloy::primitives::Address;
use tracing::instrument;

use crate::error::Result;
use crate::ports::{Cache, StatsApi};
use crate::types::entities::{Layer2Rule, Layer2Template, PriceCompleteness, PriceStat, RuleTrigger, Window};
use crate::types::events::EventOrigin;
use crate::types::primitives::LaunchpadClass;

/// Outcome of a Layer-2 evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer2Outcome {
    /// Rules passed at `window` with the given statistics.
    Admit {
        /// The window the admitting statistics were fetched at.
        window: Window,
        /// Whether widening was needed to reach this window.
        widened_from: Option<Window>,
        /// The statistics that satisfied the rule set.
        stat: PriceStat,
    },
    /// Rules evaluated but none passed.
    Reject,
    /// External-origin event without a positive launchpad classification;
    /// Layer-2 was never evaluated.
    NotClassified,
    /// Every window in the fallback chain returned empty/partial data.
    NoData,
}

/// Evaluate Layer-2 for `token`, widening windows per the fallback map
/// `{1m->5m, 5m->1h}` when a fetch returns [`PriceCompleteness::Empty`].
/// `Partial` data is evaluated as-is rather than widened further — see
/// `DESIGN.md`'s open-question decisions for why.
///
/// For `EventOrigin::External` events, `launchpad` must already be
/// [`LaunchpadClass::Fourmeme`] or this returns [`Layer2Outcome::NotClassified`]
/// without making any HTTP call.
#[instrument(skip(stats_api, cache, template), fields(%token))]
pub async fn evaluate<S: StatsApi, C: Cache>(
    token: Address,
    pair: Address,
    origin: EventOrigin,
    launchpad: LaunchpadClass,
    template: &Layer2Template,
    stats_api: &S,
    cache: &C,
) -> Result<Layer2Outcome> {
    if origin == EventOrigin::External && launchpad != LaunchpadClass::Fourmeme {
        return Ok(Layer2Outcome::NotClassified);
    }

    if cache.is_no_data_pair(&pair) {
        return Ok(Layer2Outcome::NoData);
    }

    let mut window = template.starting_window;
    let mut widened_from = None;

    loop {
        let stat = stats_api.get_stats(token, window).await?;
        if is_malformed(&stat) {
            return Ok(Layer2Outcome::Reject);
        }

        match stat.completeness {
            PriceCompleteness::Empty => match window.widen() {
                Some(next) => {
                    widened_from = Some(window);
                    window = next;
                    continue;
                }
                None => {
                    cache.set_no_data_pair(pair);
                    return Ok(Layer2Outcome::NoData);
                }
            },
            PriceCompleteness::Partial | PriceCompleteness::Complete => {
                return Ok(if rules_pass(&template.rules, template.trigger, &stat) {
                    Layer2Outcome::Admit { window, widened_from, stat }
                } else {
                    Layer2Outcome::Reject
                });
            }
        }
    }
}

/// Negative decimals can't occur (the field is unsigned); reject only
/// values that are structurally impossible for a percentage/concentration
/// field — values above 100% are rejected as malformed.
/// `top10_pct` is the only bounded-percentage field on [`PriceStat`]; token
/// decimals (also bounded, at 36) are a separate field on [`crate::types::entities::PairMeta`]
/// rejected in `resolve::MetadataResolver::call_decimals`, so the check
/// here is limited to the ranges `PriceStat` can actually violate.
fn is_malformed(stat: &PriceStat) -> bool {
    !(0.0..=100.0).contains(&stat.top10_pct) || stat.volume_usd < 0.0
}

/// Zero-valued percentages are admitted only if explicitly `>= threshold`
/// (i.e. no implicit "truthy nonzero" shortcut); simultaneous rise/fall
/// rules combine disjunctively, same as every other rule under `Any`.
fn rules_pass(rules: &[Layer2Rule], trigger: RuleTrigger, stat: &PriceStat) -> bool {
    if rules.is_empty() {
        return false;
    }
    let mut results = rules.iter().map(|rule| rule_passes(rule, stat));
    match trigger {
        RuleTrigger::Any => results.any(|passed| passed),
        RuleTrigger::All => results.all(|passed| passed),
    }
}

fn rule_passes(rule: &Layer2Rule, stat: &PriceStat) -> bool {
    match *rule {
        Layer2Rule::PriceRise { threshold_pct } => stat.price_change_pct >= threshold_pct,
        Layer2Rule::PriceFall { threshold_pct } => -stat.price_change_pct >= threshold_pct,
        Layer2Rule::Volume { threshold_usd } => stat.volume_usd >= threshold_usd,
        Layer2Rule::HolderConcentration { threshold_pct } => stat.top10_pct <= threshold_pct,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::cache::mocks::MockCache;
    use crate::ports::http_apis::mocks::MockStatsApi;

    fn stat(window: Window, price_change_pct: f64, completeness: PriceCompleteness) -> PriceStat {
        PriceStat {
            token: Address::from([1u8; 20]),
            window,
            price_change_pct,
            volume_usd: 1000.0,
            tx_count: 10,
            top10_pct: 20.0,
            updated_at: chrono::Utc::now(),
            completeness,
        }
    }

    fn template(window: Window, rule: Layer2Rule) -> Layer2Template {
        Layer2Template { starting_window: window, rules: vec![rule], trigger: RuleTrigger::Any }
    }

    #[tokio::test]
    async fn admits_when_rule_passes_at_starting_window() {
        let token = Address::from([1u8; 20]);
        let pair = Address::from([2u8; 20]);
        let api = MockStatsApi::new();
        api.set_stats(token, Window::OneMinute, stat(Window::OneMinute, 22.0, PriceCompleteness::Complete));
        let cache = MockCache::new();
        let tmpl = template(Window::OneMinute, Layer2Rule::PriceRise { threshold_pct: 20.0 });

        let outcome = evaluate(token, pair, EventOrigin::Internal, LaunchpadClass::Unknown, &tmpl, &api, &cache)
            .await
            .unwrap();
        assert!(matches!(outcome, Layer2Outcome::Admit { widened_from: None, .. }));
    }

    #[tokio::test]
    async fn widens_window_on_empty_then_admits() {
        let token = Address::from([1u8; 20]);
        let pair = Address::from([2u8; 20]);
        let api = MockStatsApi::new();
        api.set_stats(token, Window::OneMinute, stat(Window::OneMinute, 0.0, PriceCompleteness::Empty));
        api.set_stats(token, Window::FiveMinutes, stat(Window::FiveMinutes, 35.0, PriceCompleteness::Complete));
        let cache = MockCache::new();
        let tmpl = template(Window::OneMinute, Layer2Rule::PriceRise { threshold_pct: 30.0 });

        let outcome = evaluate(token, pair, EventOrigin::Internal, LaunchpadClass::Unknown, &tmpl, &api, &cache)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            Layer2Outcome::Admit { window: Window::FiveMinutes, widened_from: Some(Window::OneMinute), .. }
        ));
    }

    #[tokio::test]
    async fn exhausted_fallback_caches_no_data() {
        let token = Address::from([1u8; 20]);
        let pair = Address::from([2u8; 20]);
        let api = MockStatsApi::new();
        for window in [Window::OneMinute, Window::FiveMinutes, Window::OneHour] {
            api.set_stats(token, window, stat(window, 0.0, PriceCompleteness::Empty));
        }
        let cache = MockCache::new();
        let tmpl = template(Window::OneMinute, Layer2Rule::PriceRise { threshold_pct: 30.0 });

        let outcome = evaluate(token, pair, EventOrigin::Internal, LaunchpadClass::Unknown, &tmpl, &api, &cache)
            .await
            .unwrap();
        assert_eq!(outcome, Layer2Outcome::NoData);
        assert!(cache.is_no_data_pair(&pair));
    }

    #[tokio::test]
    async fn external_origin_requires_classification() {
        let token = Address::from([1u8; 20]);
        let pair = Address::from([2u8; 20]);
        let api = MockStatsApi::new();
        let cache = MockCache::new();
        let tmpl = template(Window::OneMinute, Layer2Rule::PriceRise { threshold_pct: 20.0 });

        let outcome = evaluate(token, pair, EventOrigin::External, LaunchpadClass::Unknown, &tmpl, &api, &cache)
            .await
            .unwrap();
        assert_eq!(outcome, Layer2Outcome::NotClassified);
    }

    #[tokio::test]
    async fn zero_valued_rise_is_not_implicitly_admitted() {
        let token = Address::from([1u8; 20]);
        let pair = Address::from([2u8; 20]);
        let api = MockStatsApi::new();
        api.set_stats(token, Window::OneMinute, stat(Window::OneMinute, 0.0, PriceCompleteness::Complete));
        let cache = MockCache::new();
        let tmpl = template(Window::OneMinute, Layer2Rule::PriceRise { threshold_pct: 0.0 });

        // threshold 0.0 with value 0.0 must still admit (explicit >=), but a
        // positive threshold with a zero reading must reject.
        let outcome = evaluate(token, pair, EventOrigin::Internal, LaunchpadClass::Unknown, &tmpl, &api, &cache)
            .await
            .unwrap();
        assert!(matches!(outcome, Layer2Outcome::Admit { .. }));
    }

    #[tokio::test]
    async fn disjunctive_rise_and_fall_rules() {
        let token = Address::from([1u8; 20]);
        let pair = Address::from([2u8; 20]);
        let api = MockStatsApi::new();
        api.set_stats(token, Window::OneMinute, stat(Window::OneMinute, -40.0, PriceCompleteness::Complete));
        let cache = MockCache::new();
        let tmpl = Layer2Template {
            starting_window: Window::OneMinute,
            rules: vec![
                Layer2Rule::PriceRise { threshold_pct: 20.0 },
                Layer2Rule::PriceFall { threshold_pct: 30.0 },
            ],
            trigger: RuleTrigger::Any,
        };

        let outcome = evaluate(token, pair, EventOrigin::Internal, LaunchpadClass::Unknown, &tmpl, &api, &cache)
            .await
            .unwrap();
        assert!(matches!(outcome, Layer2Outcome::Admit { .. }));
    }
}
