use crate::domain::UserId;
use crate::domain::event::InboundEvent;
use crate::domain::order::OrderId;
use crate::error::{Result, StorefrontError};
use serde::Deserialize;
use std::io::Read;

/// One row of the event stream: `type,actor,order,target,value`.
///
/// `order` is the correlation id, `target` names a catalog entry
/// and `value` carries free text (field values, references, listings,
/// decisions).
#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(rename = "type")]
    kind: String,
    actor: UserId,
    order: Option<String>,
    target: Option<String>,
    value: Option<String>,
}

fn required(field: Option<String>, name: &str, kind: &str) -> Result<String> {
    field.filter(|v| !v.is_empty()).ok_or_else(|| {
        StorefrontError::MalformedInput(format!("'{}' event requires a {}", kind, name))
    })
}

impl TryFrom<EventRecord> for InboundEvent {
    type Error = StorefrontError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let EventRecord {
            kind,
            actor,
            order,
            target,
            value,
        } = record;
        let order_id = order.filter(|o| !o.is_empty()).map(OrderId::from);

        let event = match kind.to_ascii_lowercase().as_str() {
            "start" => InboundEvent::Start { buyer: actor },
            "browse" => InboundEvent::Browse {
                buyer: actor,
                category: value.filter(|v| !v.is_empty()),
            },
            "select_product" => InboundEvent::SelectProduct {
                buyer: actor,
                product_id: required(target, "target product", &kind)?,
            },
            "advance" => InboundEvent::AdvanceField {
                buyer: actor,
                step: required(value, "value", &kind)?.parse()?,
            },
            "text" => InboundEvent::SubmitFieldValue {
                buyer: actor,
                text: value.unwrap_or_default(),
            },
            "select_payment" => InboundEvent::SelectPaymentMethod {
                buyer: actor,
                order_id,
                method_id: required(target, "target payment method", &kind)?,
            },
            "reference" => InboundEvent::SubmitReference {
                buyer: actor,
                order_id,
                code: required(value, "value", &kind)?,
            },
            "decision" => InboundEvent::AdminDecision {
                admin: actor,
                order_id: order_id.ok_or_else(|| {
                    StorefrontError::MalformedInput("'decision' event requires an order".into())
                })?,
                decision: required(value, "value", &kind)?.parse()?,
            },
            "add_product" => InboundEvent::AddProduct {
                admin: actor,
                listing: required(value, "value", &kind)?,
            },
            "edit_product" => InboundEvent::EditProduct {
                admin: actor,
                product_id: required(target, "target product", &kind)?,
                listing: required(value, "value", &kind)?,
            },
            "delete_product" => InboundEvent::DeleteProduct {
                admin: actor,
                product_id: required(target, "target product", &kind)?,
            },
            "add_payment" => InboundEvent::AddPaymentMethod {
                admin: actor,
                listing: required(value, "value", &kind)?,
            },
            "delete_payment" => InboundEvent::DeletePaymentMethod {
                admin: actor,
                method_id: required(target, "target payment method", &kind)?,
            },
            "add_slider" => InboundEvent::AddSlider {
                admin: actor,
                listing: required(value, "value", &kind)?,
            },
            "edit_slider" => InboundEvent::EditSlider {
                admin: actor,
                slider_id: required(target, "target slider", &kind)?,
                listing: required(value, "value", &kind)?,
            },
            "delete_slider" => InboundEvent::DeleteSlider {
                admin: actor,
                slider_id: required(target, "target slider", &kind)?,
            },
            "list_orders" => InboundEvent::ListOrders { admin: actor },
            "list_pending" => InboundEvent::ListPending { admin: actor },
            other => {
                return Err(StorefrontError::MalformedInput(format!(
                    "unknown event type '{}'",
                    other
                )));
            }
        };
        Ok(event)
    }
}

/// Reads inbound events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing empty columns may be left out.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads events. A bad row yields an error and the stream
    /// continues with the next one.
    pub fn events(self) -> impl Iterator<Item = Result<InboundEvent>> {
        self.reader.into_deserialize::<EventRecord>().map(|result| {
            result
                .map_err(StorefrontError::from)
                .and_then(InboundEvent::try_from)
        })
    }
}
