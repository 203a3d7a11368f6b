// https://www.twilio.com/docs/messaging/api/message-resource
// https://www.twilio.com/docs/usage/security#validating-requests

use std::collections::HashMap;

pub mod models;

use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{header, Client};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::models::MessageResponse;

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender phone number in E.164 format.
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self { options }
    }

    pub async fn send_sms(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<MessageResponse, &'static str> {
        let account_sid = self.options.account_sid.clone();
        let auth_token = self.options.auth_token.clone();

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            account_sid
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Content-Type",
            "application/x-www-form-urlencoded"
                .parse()
                .expect("Header value should parse correctly"),
        );

        let mut form_body: HashMap<&str, String> = HashMap::new();
        form_body.insert("To", recipient.to_string());
        form_body.insert("From", self.options.from_number.clone());
        form_body.insert("Body", body.to_string());

        let client = Client::new();
        let res = client
            .post(url)
            .basic_auth(account_sid, Some(auth_token))
            .headers(headers)
            .form(&form_body)
            .send()
            .await;

        match res {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    let error_body = response.text().await.unwrap_or_default();
                    eprintln!("Twilio error ({}): {}", status, error_body);
                    return Err("Twilio returned an error");
                }

                match response.json::<MessageResponse>().await {
                    Ok(data) => Ok(data),
                    Err(e) => {
                        eprintln!("Failed to parse Twilio response: {}", e);
                        Err("Error parsing message response")
                    }
                }
            }
            Err(e) => {
                eprintln!("Request to Twilio failed: {}", e);
                Err("Error sending SMS")
            }
        }
    }

    /// Validate an inbound webhook's `X-Twilio-Signature` header.
    ///
    /// Twilio signs the full request URL concatenated with every POST
    /// parameter (sorted by name, name immediately followed by value) using
    /// HMAC-SHA1 over the account's auth token, base64-encoded.
    pub fn validate_webhook_signature(
        &self,
        url: &str,
        params: &[(String, String)],
        signature: &str,
    ) -> bool {
        let expected = compute_signature(&self.options.auth_token, url, params);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}

fn compute_signature(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut payload = String::from(url);
    for (name, value) in sorted {
        payload.push_str(name);
        payload.push_str(value);
    }

    let mut mac = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());

    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TwilioService {
        TwilioService::new(TwilioOptions {
            account_sid: "AC_test".to_string(),
            auth_token: "12345".to_string(),
            from_number: "+15005550006".to_string(),
        })
    }

    #[test]
    fn test_signature_roundtrip() {
        let svc = service();
        let url = "https://example.com/sms/inbound";
        let params = vec![
            ("Body".to_string(), "need service".to_string()),
            ("From".to_string(), "+12145550100".to_string()),
        ];

        let expected = compute_signature("12345", url, &params);
        assert!(svc.validate_webhook_signature(url, &params, &expected));
    }

    #[test]
    fn test_signature_rejects_tampered_body() {
        let svc = service();
        let url = "https://example.com/sms/inbound";
        let params = vec![
            ("Body".to_string(), "need service".to_string()),
            ("From".to_string(), "+12145550100".to_string()),
        ];
        let expected = compute_signature("12345", url, &params);

        let tampered = vec![
            ("Body".to_string(), "send money".to_string()),
            ("From".to_string(), "+12145550100".to_string()),
        ];
        assert!(!svc.validate_webhook_signature(url, &tampered, &expected));
    }

    #[test]
    fn test_signature_param_order_does_not_matter() {
        let url = "https://example.com/sms/inbound";
        let a = vec![
            ("From".to_string(), "+12145550100".to_string()),
            ("Body".to_string(), "hello".to_string()),
        ];
        let b = vec![
            ("Body".to_string(), "hello".to_string()),
            ("From".to_string(), "+12145550100".to_string()),
        ];
        assert_eq!(
            compute_signature("tok", url, &a),
            compute_signature("tok", url, &b)
        );
    }
}
