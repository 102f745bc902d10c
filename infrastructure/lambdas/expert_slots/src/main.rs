use chrono::NaiveDate;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use std::env;
use talenta_libs::{DisplaySlot, SlotError, SlotExpander, SlotOrder, WeeklyAvailability};
use tracing::info;

/// An expert's weekly availability and the dates a viewer is browsing
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    availability: WeeklyAvailability,
    dates: Vec<NaiveDate>,
    viewer_timezone: Option<String>,
    order: Option<SlotOrder>,
}

#[derive(Serialize)]
struct Day {
    date: NaiveDate,
    slots: Vec<DisplaySlot>,
}

#[derive(Serialize)]
struct Response {
    days: Vec<Day>,
}

/// Defaults for requests that leave the viewer zone or slot order out
struct Config {
    viewer_timezone: String,
    order: SlotOrder,
}

impl Config {
    fn from_env() -> Result<Config, Error> {
        let viewer_timezone = env::var("DEFAULT_VIEWER_TZ").unwrap_or_else(|_| "UTC".to_string());
        let order = match env::var("SLOT_ORDER") {
            Ok(order) => order.parse::<SlotOrder>()?,
            Err(_) => SlotOrder::default(),
        };

        Ok(Config {
            viewer_timezone,
            order,
        })
    }
}

fn expand_request(config: &Config, request: Request) -> Result<Response, SlotError> {
    let viewer = request
        .viewer_timezone
        .as_deref()
        .unwrap_or(&config.viewer_timezone);

    let expander =
        SlotExpander::for_zone(viewer)?.with_order(request.order.unwrap_or(config.order));

    let days = expander
        .expand_days(&request.availability, &request.dates)?
        .into_iter()
        .map(|(date, slots)| Day { date, slots })
        .collect();

    Ok(Response { days })
}

async fn function_handler(config: &Config, event: LambdaEvent<Request>) -> Result<Response, Error> {
    info!(
        "Expanding {} date(s) of availability in {}",
        event.payload.dates.len(),
        event.payload.availability.timezone
    );

    Ok(expand_request(config, event.payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let config = Config::from_env()?;
    let config = &config;

    run(service_fn(move |event: LambdaEvent<Request>| async move {
        function_handler(config, event).await
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            viewer_timezone: "UTC".to_string(),
            order: SlotOrder::AsGenerated,
        }
    }

    #[test]
    fn expands_requested_dates() {
        let request: Request = serde_json::from_str(
            r#"{
                "availability": {
                    "timezone": "Asia/Kolkata",
                    "schedule": { "MONDAY": [{ "start": "09:00", "end": "12:00" }] }
                },
                "dates": ["2024-01-01", "2024-01-02"]
            }"#,
        )
        .unwrap();

        let response = serde_json::to_value(expand_request(&config(), request).unwrap()).unwrap();

        assert_eq!(response["days"][0]["date"], "2024-01-01");
        assert_eq!(response["days"][0]["slots"][0]["time"], "03:30");
        assert_eq!(response["days"][0]["slots"][0]["startsAt"], "2024-01-01T03:30:00Z");
        assert_eq!(response["days"][0]["slots"].as_array().unwrap().len(), 3);
        assert_eq!(response["days"][1]["slots"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn request_overrides_viewer_zone() {
        let request: Request = serde_json::from_str(
            r#"{
                "availability": {
                    "timezone": "UTC",
                    "schedule": { "MONDAY": [{ "start": "22:00", "end": "24:00" }] }
                },
                "dates": ["2024-01-01"],
                "viewerTimezone": "Asia/Tokyo",
                "order": "sorted"
            }"#,
        )
        .unwrap();

        let response = expand_request(&config(), request).unwrap();
        let slots = &response.days[0].slots;

        assert_eq!(slots[0].time, "07:00");
        assert_eq!(slots[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn unknown_viewer_zone() {
        let request = Request {
            availability: WeeklyAvailability::new("UTC"),
            dates: vec![],
            viewer_timezone: Some("Nowhere/Land".to_string()),
            order: None,
        };

        assert!(matches!(
            expand_request(&config(), request),
            Err(SlotError::TimeZone { .. })
        ));
    }
}
