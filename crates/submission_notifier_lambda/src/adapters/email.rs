use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use submission_notifier_core::notification::EmailMessage;

const CHARSET: &str = "UTF-8";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, sender: &str, recipient: &str, email: &EmailMessage) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct SesNotifier {
    client: aws_sdk_sesv2::Client,
}

impl SesNotifier {
    pub fn new(client: aws_sdk_sesv2::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send(&self, sender: &str, recipient: &str, email: &EmailMessage) -> Result<(), String> {
        let destination = Destination::builder().to_addresses(recipient).build();

        let message = Message::builder()
            .subject(utf8_content(&email.subject)?)
            .body(
                Body::builder()
                    .html(utf8_content(&email.html_body)?)
                    .text(utf8_content(&email.text_body)?)
                    .build(),
            )
            .build();

        self.client
            .send_email()
            .from_email_address(sender)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map(|_| ())
            .map_err(|error| format!("The email was not sent: {error}"))
    }
}

fn utf8_content(data: &str) -> Result<Content, String> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|error| format!("failed to build email content: {error}"))
}
