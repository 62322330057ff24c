//! Checks the certificate of a counter modulo `n` over a composite interval domain.
//!
//! Run with:
//! ```bash
//! cargo run --example check_certificate -- 6 --corrupt 3
//! ```

use clap::Parser;
use log::info;

use reach_rs::algorithm::AnalysisError;
use reach_rs::arg::{Arg, ArgBuilder};
use reach_rs::composite::{CompositeDomain, CompositeState};
use reach_rs::domain::{AbstractDomain, DomainError};
use reach_rs::pcc::{CertificateChecker, DomainProofChecker, Verdict};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Counter modulus.
    #[arg(value_name = "INT", default_value = "5")]
    n: u32,

    /// Claim a wrong successor for this counter value.
    #[clap(long, value_name = "INT")]
    corrupt: Option<u32>,

    /// Reject states whose counter exceeds this bound.
    #[clap(long, value_name = "INT")]
    bound: Option<u32>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Interval {
    lo: u32,
    hi: u32,
}

impl Interval {
    fn point(v: u32) -> Self {
        Interval { lo: v, hi: v }
    }
}

struct IntervalDomain;

impl AbstractDomain for IntervalDomain {
    type State = Interval;

    fn is_less_or_equal(&self, a: &Interval, b: &Interval) -> bool {
        b.lo <= a.lo && a.hi <= b.hi
    }

    fn join(&self, a: &Interval, b: &Interval) -> Result<Interval, DomainError> {
        Ok(Interval {
            lo: a.lo.min(b.lo),
            hi: a.hi.max(b.hi),
        })
    }
}

/// Counter value and its parity.
fn counter(x: u32) -> CompositeState<Interval> {
    CompositeState::new(vec![Interval::point(x), Interval::point(x % 2)])
}

fn value(s: &CompositeState<Interval>) -> u32 {
    s.get(0).map_or(0, |x| x.lo)
}

/// 0 -> 1 -> ... -> n-1 -> 0', with 0' covered by the root.
fn certificate(n: u32, corrupt: Option<u32>) -> Arg<CompositeState<Interval>> {
    let mut builder = ArgBuilder::new(counter(0));
    let mut last = builder.root();
    for x in 0..n {
        let claimed = if corrupt == Some(x) { x + 2 } else { x + 1 };
        last = builder.add_child(last, counter(claimed % n));
    }
    builder.set_covered_by(last, builder.root());
    builder.build()
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);
    color_eyre::eyre::ensure!(args.n > 0, "modulus must be positive");

    let n = args.n;
    let domain = CompositeDomain::<Interval>::new(vec![Box::new(IntervalDomain), Box::new(IntervalDomain)]);
    let oracle = DomainProofChecker::new(domain, move |s: &CompositeState<Interval>| {
        Ok::<_, AnalysisError>(vec![counter((value(s) + 1) % n)])
    });

    let arg = certificate(n, args.corrupt);
    info!("Certificate has {} states", arg.len());

    let bound = args.bound.unwrap_or(u32::MAX);
    let mut checker =
        CertificateChecker::new(&oracle).with_property_checker(move |s: &CompositeState<Interval>| value(s) <= bound);
    let verdict = checker.check_arg(&arg, ())?;

    match &verdict {
        Verdict::Valid => println!("Certificate is valid"),
        Verdict::Invalid(violation) => println!("Certificate is invalid: {}", violation),
    }
    println!("{}", checker.statistics());

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
