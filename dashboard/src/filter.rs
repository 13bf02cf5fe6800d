use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use std::fmt;

/// Category value meaning "no category filter"
pub const ALL: &str = "all";

/// Ordered query parameters for a GET request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// List endpoints that accept filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEndpoint {
    Images,
    Watering,
    SensorHistory,
}

impl ListEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ListEndpoint::Images => "/api/data/images",
            ListEndpoint::Watering => "/api/data/watering",
            ListEndpoint::SensorHistory => "/api/data/sensors",
        }
    }

    /// Name of the query parameter carrying the category filter
    pub fn category_param(&self) -> Option<&'static str> {
        match self {
            ListEndpoint::Images => Some("prediction"),
            ListEndpoint::Watering => Some("mode"),
            ListEndpoint::SensorHistory => None,
        }
    }

    pub fn default_limit(&self) -> u32 {
        match self {
            ListEndpoint::Images => 20,
            ListEndpoint::Watering => 50,
            ListEndpoint::SensorHistory => 100,
        }
    }
}

/// User-facing filter selections for a list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub category: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: u32,
    pub skip: u32,
}

impl ListFilter {
    pub fn new(limit: u32) -> Self {
        Self {
            category: ALL.to_string(),
            start_date: None,
            end_date: None,
            limit,
            skip: 0,
        }
    }

    pub fn for_endpoint(endpoint: ListEndpoint) -> Self {
        Self::new(endpoint.default_limit())
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn has_category(&self) -> bool {
        let category = self.category.trim();
        !category.is_empty() && !category.eq_ignore_ascii_case(ALL)
    }

    pub fn next_page(&mut self) {
        self.skip = self.skip.saturating_add(self.limit);
    }

    pub fn previous_page(&mut self) {
        self.skip = self.skip.saturating_sub(self.limit);
    }

    /// Query parameters with day boundaries taken in UTC
    pub fn to_query(&self, endpoint: ListEndpoint) -> QueryParams {
        self.to_query_in(endpoint, &Utc)
    }

    /// Query parameters with day boundaries taken in `tz`. The start date is
    /// widened to 00:00:00.000 and the end date to 23:59:59.999 so both are
    /// inclusive.
    pub fn to_query_in<Tz: TimeZone>(&self, endpoint: ListEndpoint, tz: &Tz) -> QueryParams {
        let mut params = QueryParams::new()
            .with("limit", self.limit.to_string())
            .with("skip", self.skip.to_string());

        if let Some(name) = endpoint.category_param() {
            if self.has_category() {
                params.push(name, self.category.trim());
            }
        }

        if let Some(start) = self.start_date {
            let naive = start.and_time(NaiveTime::MIN);
            params.push("start_date", iso_utc(localize(tz, naive)));
        }

        if let Some(end) = self.end_date {
            let naive = end.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1);
            params.push("end_date", iso_utc(localize(tz, naive)));
        }

        params
    }
}

fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Wall-clock time skipped by a DST jump
        None => Utc.from_utc_datetime(&naive),
    }
}

fn iso_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_category_is_omitted() {
        let params = ListFilter::new(20).category("all").to_query(ListEndpoint::Images);
        assert_eq!(params.to_string(), "limit=20&skip=0");
        assert!(!params.contains("prediction"));

        let params = ListFilter::new(20).category("All").to_query(ListEndpoint::Watering);
        assert!(!params.contains("mode"));
    }

    #[test]
    fn test_category_maps_to_endpoint_param() {
        let filter = ListFilter::new(20).category("Healthy");
        assert_eq!(
            filter.to_query(ListEndpoint::Images).get("prediction"),
            Some("Healthy")
        );

        let filter = ListFilter::new(50).category("manual");
        assert_eq!(filter.to_query(ListEndpoint::Watering).get("mode"), Some("manual"));
    }

    #[test]
    fn test_dates_are_inclusive_day_bounds() {
        let params = ListFilter::new(20)
            .dates(Some(date(2025, 6, 15)), Some(date(2025, 6, 17)))
            .to_query(ListEndpoint::Images);

        assert_eq!(params.get("start_date"), Some("2025-06-15T00:00:00.000Z"));
        assert_eq!(params.get("end_date"), Some("2025-06-17T23:59:59.999Z"));
    }

    #[test]
    fn test_dates_in_local_time_zone() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let params = ListFilter::new(20)
            .dates(Some(date(2025, 6, 17)), Some(date(2025, 6, 17)))
            .to_query_in(ListEndpoint::Watering, &tz);

        assert_eq!(params.get("start_date"), Some("2025-06-16T17:00:00.000Z"));
        assert_eq!(params.get("end_date"), Some("2025-06-17T16:59:59.999Z"));
    }

    #[test]
    fn test_same_inputs_same_params() {
        let filter = ListFilter::new(10)
            .category("Bacterial spot")
            .dates(None, Some(date(2025, 1, 1)));
        assert_eq!(
            filter.to_query(ListEndpoint::Images),
            filter.to_query(ListEndpoint::Images)
        );
        assert_eq!(
            filter.to_query(ListEndpoint::Images).to_string(),
            "limit=10&skip=0&prediction=Bacterial+spot&end_date=2025-01-01T23%3A59%3A59.999Z"
        );
    }

    #[test]
    fn test_paging_never_goes_negative() {
        let mut filter = ListFilter::new(20);
        filter.next_page();
        filter.next_page();
        assert_eq!(filter.skip, 40);
        filter.previous_page();
        filter.previous_page();
        filter.previous_page();
        assert_eq!(filter.skip, 0);
    }

    #[test]
    fn test_history_endpoint_has_no_category() {
        let params = ListFilter::for_endpoint(ListEndpoint::SensorHistory)
            .category("Healthy")
            .to_query(ListEndpoint::SensorHistory);
        assert_eq!(params.to_string(), "limit=100&skip=0");
    }
}
