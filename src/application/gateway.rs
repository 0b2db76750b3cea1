use crate::domain::UserId;
use crate::domain::notification::{DecisionTicket, Notification};
use crate::domain::order::{Order, OrderId};
use crate::error::{Result, StorefrontError};
use dashmap::DashMap;

/// Tracks the outstanding admin decision for every submitted order.
///
/// Requests are fire-and-forget: the engine records the ticket, hands the
/// admins a decision request and returns. The decision arrives later as an
/// independent event correlated by order id.
pub struct ApprovalGateway {
    tickets: DashMap<OrderId, DecisionTicket>,
    admins: Vec<UserId>,
}

impl ApprovalGateway {
    pub fn new(mut admins: Vec<UserId>) -> Self {
        admins.sort_unstable();
        admins.dedup();
        Self {
            tickets: DashMap::new(),
            admins,
        }
    }

    /// Returns the ticket for `order`, creating it on first request.
    ///
    /// Asking again for the same order re-presents the existing ticket rather
    /// than opening a second approval context.
    pub fn request_decision(&self, order: &Order, product_name: &str, price: &str) -> Result<DecisionTicket> {
        let reference = order.reference.clone().ok_or_else(|| {
            StorefrontError::InvariantViolation(format!(
                "order {} submitted for approval without a reference",
                order.id
            ))
        })?;

        let mut ticket = self
            .tickets
            .entry(order.id.clone())
            .or_insert_with(|| DecisionTicket {
                order_id: order.id.clone(),
                buyer: order.buyer,
                product_name: product_name.to_string(),
                price: price.to_string(),
                name: order.name.clone(),
                email: order.email.clone(),
                reference,
                created_at: order.created_at,
                presentations: 0,
            });
        ticket.presentations += 1;
        Ok(ticket.clone())
    }

    /// One decision request per admin.
    pub fn presentations(&self, ticket: &DecisionTicket) -> Vec<Notification> {
        self.admins
            .iter()
            .map(|admin| Notification::DecisionRequest {
                to: *admin,
                ticket: ticket.clone(),
            })
            .collect()
    }

    /// Claims the ticket for a decision. Only the first caller gets it.
    pub fn on_decision(&self, order_id: &OrderId) -> Result<DecisionTicket> {
        self.tickets
            .remove(order_id)
            .map(|(_, ticket)| ticket)
            .ok_or_else(|| StorefrontError::AlreadyResolved(order_id.clone()))
    }

    /// Puts back a claimed ticket whose decision could not be carried out.
    pub fn restore(&self, ticket: DecisionTicket) {
        self.tickets.insert(ticket.order_id.clone(), ticket);
    }

    /// Outstanding tickets, oldest first.
    pub fn outstanding(&self) -> Vec<DecisionTicket> {
        let mut tickets: Vec<DecisionTicket> =
            self.tickets.iter().map(|entry| entry.value().clone()).collect();
        tickets.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        tickets
    }

    pub fn admins(&self) -> &[UserId] {
        &self.admins
    }
}
