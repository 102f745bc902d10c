use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use talenta_libs::{Booking, BookingAction, Role};
use tracing::{info, warn};

/// A user action on a booking, as sent by the app
#[derive(Deserialize)]
struct Request {
    booking: Booking,
    actor: Role,
    action: BookingAction,
}

/// Rejected actions come back as `error` so the app can show them as-is
#[derive(Serialize, Debug, PartialEq)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    booking: Option<Booking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn transition(request: &Request) -> Response {
    match request.booking.apply(request.actor, &request.action) {
        Ok(booking) => Response {
            booking: Some(booking),
            error: None,
        },
        Err(err) => {
            warn!("Booking {}: {}", request.booking.booking_id, err);
            Response {
                booking: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    info!(
        "{:?} acting on booking {}",
        event.payload.actor, event.payload.booking.booking_id
    );

    Ok(transition(&event.payload))
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

    run(service_fn(function_handler)).await
}
