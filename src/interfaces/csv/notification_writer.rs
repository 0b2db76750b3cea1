use crate::domain::UserId;
use crate::domain::notification::Notification;
use crate::domain::ports::Notifier;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use tokio::sync::Mutex;

#[derive(Debug, Serialize)]
struct NotificationRecord<'a> {
    recipient: UserId,
    kind: &'a str,
    order: Option<&'a str>,
    text: String,
}

/// Writes every outbound message as a `recipient,kind,order,text` CSV row.
///
/// Rows are flushed as they are written so a consumer tailing the output
/// sees each message as soon as the engine emits it.
pub struct CsvNotifier<W: Write + Send> {
    writer: Mutex<csv::Writer<W>>,
}

impl<W: Write + Send> CsvNotifier<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: Mutex::new(csv::Writer::from_writer(sink)),
        }
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

#[async_trait]
impl<W: Write + Send> Notifier for CsvNotifier<W> {
    async fn notify(&self, notification: Notification) -> Result<()> {
        let record = NotificationRecord {
            recipient: notification.recipient(),
            kind: notification.kind(),
            order: notification.order_id().map(|id| id.as_str()),
            text: notification.to_string(),
        };
        let mut writer = self.writer.lock().await;
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderId;

    #[tokio::test]
    async fn test_writes_header_and_rows() {
        let notifier = CsvNotifier::new(Vec::new());
        notifier
            .notify(Notification::AwaitingApproval {
                to: 10,
                order_id: OrderId::from("ORD-00000001"),
            })
            .await
            .unwrap();
        notifier
            .notify(Notification::Error {
                to: 11,
                message: "Product P0009 not found".into(),
            })
            .await
            .unwrap();

        let out = String::from_utf8(notifier.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "recipient,kind,order,text");
        assert!(lines[1].starts_with("10,awaiting_approval,ORD-00000001,"));
        assert_eq!(lines[2], "11,error,,Product P0009 not found");
    }
}
