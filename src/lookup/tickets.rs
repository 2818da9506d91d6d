//! Ticket purchase messages.
//!
//! There is no ticketing backend: `buy_ticket` asks the model to get the
//! user's confirmation and `confirm_ticket_purchase` reports success.

pub fn purchase_confirmation_request(theater: &str, movie: &str, showtime: &str) -> String {
    format!(
        "Ask user for purchase ticket confirmation for {} at {} for {}.",
        movie, theater, showtime
    )
}

pub fn purchase_confirmed(theater: &str, movie: &str, showtime: &str) -> String {
    format!("Ticket purchased for {} at {} for {}.", movie, theater, showtime)
}
