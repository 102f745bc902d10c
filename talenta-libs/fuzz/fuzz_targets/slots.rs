#![no_main]
use chrono::{Days, NaiveDate};
use chrono_tz::TZ_VARIANTS;
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;
use talenta_libs::{
    availability::{DayOfWeek, WeeklyAvailability},
    slots::{SlotExpander, SlotOrder},
    time::TimeRange,
};

fuzz_target!(|data: (WeeklyAvailability, u16, u16, u16)| {
    #[cfg(feature = "log")]
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()
        .ok();

    let (mut availability, provider, viewer, offset) = data;
    let provider = TZ_VARIANTS[usize::from(provider) % TZ_VARIANTS.len()];
    let viewer = TZ_VARIANTS[usize::from(viewer) % TZ_VARIANTS.len()];
    availability.timezone = provider.name().to_string();

    let date = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.checked_add_days(Days::new(u64::from(offset))))
        .expect("Date within range");
    let day = DayOfWeek::of(date);

    let generated = SlotExpander::new(viewer)
        .expand(&availability, date)
        .expect("Known zones always expand");

    let upper_bound: usize = availability
        .ranges(day)
        .iter()
        .copied()
        .map(TimeRange::hours)
        .sum();
    assert!(
        generated.len() <= upper_bound,
        "More slots than hours offered: {} > {}",
        generated.len(),
        upper_bound
    );

    let sorted = SlotExpander::new(viewer)
        .with_order(SlotOrder::Sorted)
        .expand(&availability, date)
        .expect("Known zones always expand");

    assert!(
        sorted.windows(2).all(|w| w[0].starts_at < w[1].starts_at),
        "Sorted slots are not strictly increasing"
    );

    let shown = generated
        .iter()
        .map(|s| (s.date, s.time.clone()))
        .collect::<HashSet<_>>();
    assert_eq!(shown.len(), sorted.len(), "Sorted slots lost or gained a displayed time");

    let local = SlotExpander::new(provider)
        .expand(&availability, date)
        .expect("Known zones always expand");
    let offered = availability
        .ranges(day)
        .iter()
        .flat_map(|r| r.hourly())
        .map(|t| t.to_string())
        .collect::<HashSet<_>>();

    assert!(
        local.iter().all(|s| s.date == date && offered.contains(&s.time)),
        "Round trip through {} changed a slot",
        provider
    );
});
