use optrl::pricing::{
    bs_price, BaselinePricer, Dynamics, OptionSpec, OptionType, StochasticVolParams,
    BINOMIAL_LABEL, BLACK_SCHOLES_LABEL,
};

fn spec(option_type: OptionType, strike: f64, dividend_yield: f64) -> OptionSpec {
    OptionSpec::new(
        100.0,
        strike,
        0.01,
        dividend_yield,
        0.2,
        1.0,
        50,
        option_type,
        Dynamics::Lognormal,
    )
    .expect("valid spec")
}

/// Reference prices for the at-the-money contract used throughout the docs.
#[test]
fn black_scholes_matches_reference_values() {
    let put = BaselinePricer::new(spec(OptionType::Put, 100.0, 0.0)).black_scholes();
    let call = BaselinePricer::new(spec(OptionType::Call, 100.0, 0.0)).black_scholes();

    assert!((put - 7.438302065026413).abs() < 1e-6, "put = {put}");
    assert!((call - 8.433318690109608).abs() < 1e-6, "call = {call}");
}

/// C - P = S e^{-dT} - K e^{-rT} across strikes and dividend yields.
#[test]
fn put_call_parity_holds_on_a_grid() {
    for strike in [60.0, 80.0, 100.0, 120.0, 150.0] {
        for dividend_yield in [0.0, 0.02, 0.05] {
            let call = BaselinePricer::new(spec(OptionType::Call, strike, dividend_yield));
            let put = BaselinePricer::new(spec(OptionType::Put, strike, dividend_yield));

            let lhs = call.black_scholes() - put.black_scholes();
            let rhs = 100.0 * (-dividend_yield).exp() - strike * (-0.01_f64).exp();
            assert!(
                (lhs - rhs).abs() < 1e-9,
                "parity broken at K={strike}, d={dividend_yield}: {lhs} vs {rhs}"
            );
        }
    }
}

/// The tree row stays close to the closed form for both sides.
#[test]
fn binomial_row_tracks_black_scholes() {
    for option_type in [OptionType::Call, OptionType::Put] {
        let results = BaselinePricer::new(spec(option_type, 100.0, 0.0))
            .baseline_model()
            .expect("baseline");
        let bs = results.get(BLACK_SCHOLES_LABEL).expect("bs row");
        let tree = results.get(BINOMIAL_LABEL).expect("tree row");
        assert!((bs - tree).abs() < 1e-2, "{option_type}: bs={bs}, tree={tree}");
    }
}

/// Prices are non-negative and bounded by the spot (call) or discounted strike (put).
#[test]
fn prices_respect_no_arbitrage_bounds() {
    for strike in [1.0, 50.0, 100.0, 200.0, 1_000.0] {
        let call = bs_price(OptionType::Call, 100.0, strike, 0.01, 0.0, 0.2, 1.0);
        let put = bs_price(OptionType::Put, 100.0, strike, 0.01, 0.0, 0.2, 1.0);
        assert!((0.0..=100.0).contains(&call), "call {call} at K={strike}");
        assert!(
            (0.0..=strike * (-0.01_f64).exp() + 1e-12).contains(&put),
            "put {put} at K={strike}"
        );
    }
}

/// Stochastic-vol contracts still get flat-vol baseline rows.
#[test]
fn baseline_under_stochastic_vol_uses_flat_volatility() {
    let flat = spec(OptionType::Put, 100.0, 0.0);
    let sv = OptionSpec {
        dynamics: Dynamics::StochasticVol(StochasticVolParams::default()),
        ..flat
    };

    let flat_results = BaselinePricer::new(flat).baseline_model().expect("flat");
    let sv_results = BaselinePricer::new(sv).baseline_model().expect("sv");
    assert_eq!(flat_results, sv_results);
}
