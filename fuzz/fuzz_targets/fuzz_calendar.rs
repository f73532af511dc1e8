#![no_main]
use libfuzzer_sys::fuzz_target;

use airbnb_positioning::domain::date_selector::{
    MonthPolicy, NightsPolicy, ProbeSelection, select_probes,
};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(index) = airbnb_positioning::domain::availability::build_availability(&json) else {
        return;
    };
    let Some(today) = chrono::NaiveDate::from_ymd_opt(2026, 1, 15) else {
        return;
    };
    let selection = ProbeSelection {
        dates_per_month: 3,
        months_to_check: 3,
        month_policy: MonthPolicy::NextMonth,
        nights_policy: NightsPolicy::FlexibleMaximum { max_nights: 14 },
    };
    for probe in select_probes(&index, &selection, today) {
        assert!(probe.check_in > today);
        assert!(index.is_available(probe.check_in));
    }
});
