//! Best-effort, chunked delivery of notification batches

use tracing::{debug, error, info, instrument, warn};

use super::push::{PushMessage, PushService, PushTicket, TicketStatus};

/// Outcome of delivering one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub chunks_sent: usize,
    pub chunks_failed: usize,
    pub tickets: Vec<PushTicket>,
}

impl DeliveryReport {
    pub fn rejected_tickets(&self) -> usize {
        self.tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Error)
            .count()
    }
}

/// Send `messages` in chunks of `service.chunk_size()`.
///
/// A failing chunk is logged and skipped; the remaining chunks are still sent.
/// Nothing is retried.
#[instrument(skip_all, fields(messages = messages.len()))]
pub async fn deliver<S>(service: &S, messages: Vec<PushMessage>) -> DeliveryReport
where
    S: PushService + ?Sized,
{
    let mut report = DeliveryReport::default();
    if messages.is_empty() {
        return report;
    }

    info!("sending {} notification(s)", messages.len());

    let chunk_size = service.chunk_size().max(1);
    for chunk in messages.chunks(chunk_size) {
        match service.send_chunk(chunk.to_vec()).await {
            Ok(tickets) => {
                report.chunks_sent += 1;
                for ticket in tickets.iter().filter(|t| t.status == TicketStatus::Error) {
                    warn!(
                        "push ticket rejected: {} ({:?})",
                        ticket.message.as_deref().unwrap_or("no message"),
                        ticket.details
                    );
                }
                report.tickets.extend(tickets);
            }
            Err(e) => {
                report.chunks_failed += 1;
                error!("error sending push notifications: {e:#}");
            }
        }
    }

    debug!(
        "delivery finished: {} chunk(s) sent, {} failed, {} ticket(s) rejected",
        report.chunks_sent,
        report.chunks_failed,
        report.rejected_tickets()
    );

    report
}
