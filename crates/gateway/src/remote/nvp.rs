//! HTTP client for the provider's name-value-pair API.
//!
//! Requests are form-encoded `KEY=value` pairs carrying the merchant
//! credentials, the protocol version and the method name. Responses come
//! back in the same encoding with an `ACK` field and, on failure, indexed
//! `L_ERRORCODEn` / `L_SHORTMESSAGEn` / `L_LONGMESSAGEn` entries.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::Currency;
use reqwest::Client;
use rust_decimal::Decimal;
use url::Url;

use super::types::*;
use super::{ExpressCheckoutApi, TransportError, express_checkout_url};
use crate::config::GatewayConfig;

const API_VERSION: &str = "204.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type Fields = HashMap<String, String>;

/// Name-value-pair API client authenticated with signature credentials.
#[derive(Clone)]
pub struct NvpClient {
    client: Client,
    endpoint: Url,
    checkout_base: Url,
    user: String,
    password: String,
    signature: String,
}

impl NvpClient {
    /// Creates a client for the endpoint selected by the configured mode.
    pub fn new(config: &GatewayConfig) -> Result<Self, TransportError> {
        let endpoint = parse_url(config.mode.nvp_endpoint())?;
        let checkout_base = parse_url(config.mode.checkout_base())?;
        Self::with_endpoint(config, endpoint, checkout_base)
    }

    /// Creates a client against explicit endpoints.
    pub fn with_endpoint(
        config: &GatewayConfig,
        endpoint: Url,
        checkout_base: Url,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint,
            checkout_base,
            user: config.login.clone(),
            password: config.password.clone(),
            signature: config.signature.clone(),
        })
    }

    async fn call(
        &self,
        operation: Operation,
        params: Vec<(String, String)>,
    ) -> Result<(Ack, Vec<RemoteErrorEntry>, Fields), TransportError> {
        let mut form: Vec<(String, String)> = vec![
            ("USER".to_string(), self.user.clone()),
            ("PWD".to_string(), self.password.clone()),
            ("SIGNATURE".to_string(), self.signature.clone()),
            ("VERSION".to_string(), API_VERSION.to_string()),
            ("METHOD".to_string(), operation.as_str().to_string()),
        ];
        form.extend(params);

        tracing::debug!(%operation, endpoint = %self.endpoint, "sending NVP request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let fields: Fields = serde_urlencoded::from_str(&body)
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        let ack = fields
            .get("ACK")
            .map(|a| Ack::parse(a))
            .ok_or_else(|| TransportError::Decode("missing ACK".to_string()))?;
        let errors = parse_errors(&fields);

        Ok((ack, errors, fields))
    }

    /// Runs a call and decodes the details of a successful answer.
    async fn call_decoded<T>(
        &self,
        operation: Operation,
        params: Vec<(String, String)>,
        decode: impl FnOnce(&Fields) -> Result<T, TransportError>,
    ) -> Result<RemoteResponse<T>, TransportError> {
        let (ack, errors, fields) = self.call(operation, params).await?;
        let details = if ack.is_success() {
            Some(decode(&fields)?)
        } else {
            None
        };
        Ok(RemoteResponse {
            ack,
            errors,
            details,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, TransportError> {
    Url::parse(raw).map_err(|e| TransportError::Decode(format!("invalid endpoint {raw}: {e}")))
}

/// Collects `L_*n` error entries in index order.
fn parse_errors(fields: &Fields) -> Vec<RemoteErrorEntry> {
    let mut errors = Vec::new();
    for n in 0.. {
        let code = fields.get(&format!("L_ERRORCODE{n}")).cloned();
        let short = fields.get(&format!("L_SHORTMESSAGE{n}")).cloned();
        let long = fields.get(&format!("L_LONGMESSAGE{n}")).cloned();
        if code.is_none() && short.is_none() && long.is_none() {
            break;
        }
        errors.push(RemoteErrorEntry {
            code,
            short_message: short.unwrap_or_default(),
            long_message: long.unwrap_or_default(),
        });
    }
    errors
}

fn required(fields: &Fields, key: &str) -> Result<String, TransportError> {
    fields
        .get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| TransportError::Decode(format!("missing {key}")))
}

fn optional(fields: &Fields, key: &str) -> Option<String> {
    fields.get(key).filter(|v| !v.is_empty()).cloned()
}

fn push(params: &mut Vec<(String, String)>, key: impl Into<String>, value: impl Into<String>) {
    params.push((key.into(), value.into()));
}

fn push_amount(params: &mut Vec<(String, String)>, key: &str, currency_key: &str, amount: &Amount) {
    push(params, key, amount.formatted());
    push(params, currency_key, amount.currency.code());
}

/// Encodes the set-express-checkout fields.
pub(crate) fn encode_set_express_checkout(request: &SetExpressCheckoutRequest) -> Vec<(String, String)> {
    let mut params = Vec::new();
    push(&mut params, "RETURNURL", &request.return_url);
    push(&mut params, "CANCELURL", &request.cancel_url);
    push(&mut params, "SOLUTIONTYPE", &request.solution_type);
    push(&mut params, "LANDINGPAGE", &request.landing_page);
    if !request.header_image.is_empty() {
        push(&mut params, "HDRIMG", &request.header_image);
    }
    push(&mut params, "NOSHIPPING", if request.no_shipping { "1" } else { "0" });

    let details = &request.payment_details;
    push(&mut params, "PAYMENTREQUEST_0_INVNUM", &request.invoice_id);
    push_amount(
        &mut params,
        "PAYMENTREQUEST_0_AMT",
        "PAYMENTREQUEST_0_CURRENCYCODE",
        &details.order_total,
    );
    if let Some(item_total) = &details.item_total {
        push(&mut params, "PAYMENTREQUEST_0_ITEMAMT", item_total.formatted());
    }
    if let Some(shipping) = &details.shipping_total {
        push(&mut params, "PAYMENTREQUEST_0_SHIPPINGAMT", shipping.formatted());
    }
    if let Some(tax) = &details.tax_total {
        push(&mut params, "PAYMENTREQUEST_0_TAXAMT", tax.formatted());
    }
    push(
        &mut params,
        "PAYMENTREQUEST_0_PAYMENTACTION",
        details.payment_action.as_str(),
    );

    if let Some(ship_to) = &details.ship_to {
        push(&mut params, "PAYMENTREQUEST_0_SHIPTONAME", &ship_to.name);
        push(&mut params, "PAYMENTREQUEST_0_SHIPTOSTREET", &ship_to.street1);
        if let Some(street2) = &ship_to.street2 {
            push(&mut params, "PAYMENTREQUEST_0_SHIPTOSTREET2", street2);
        }
        push(&mut params, "PAYMENTREQUEST_0_SHIPTOCITY", &ship_to.city);
        push(&mut params, "PAYMENTREQUEST_0_SHIPTOSTATE", &ship_to.state_or_province);
        push(&mut params, "PAYMENTREQUEST_0_SHIPTOCOUNTRYCODE", &ship_to.country_code);
        push(&mut params, "PAYMENTREQUEST_0_SHIPTOZIP", &ship_to.postal_code);
    }

    for (n, item) in details.items.iter().enumerate() {
        push(&mut params, format!("L_PAYMENTREQUEST_0_NAME{n}"), &item.name);
        if let Some(number) = &item.number {
            push(&mut params, format!("L_PAYMENTREQUEST_0_NUMBER{n}"), number);
        }
        push(&mut params, format!("L_PAYMENTREQUEST_0_QTY{n}"), item.quantity.to_string());
        push(&mut params, format!("L_PAYMENTREQUEST_0_AMT{n}"), item.amount.formatted());
        if let Some(category) = item.category {
            push(
                &mut params,
                format!("L_PAYMENTREQUEST_0_ITEMCATEGORY{n}"),
                category.as_str(),
            );
        }
    }

    params
}

#[async_trait]
impl ExpressCheckoutApi for NvpClient {
    async fn set_express_checkout(
        &self,
        request: SetExpressCheckoutRequest,
    ) -> Result<RemoteResponse<SetExpressCheckoutResponse>, TransportError> {
        self.call_decoded(
            Operation::SetExpressCheckout,
            encode_set_express_checkout(&request),
            |fields| {
                Ok(SetExpressCheckoutResponse {
                    token: required(fields, "TOKEN")?,
                })
            },
        )
        .await
    }

    async fn get_express_checkout_details(
        &self,
        token: &str,
    ) -> Result<RemoteResponse<ExpressCheckoutDetails>, TransportError> {
        let params = vec![("TOKEN".to_string(), token.to_string())];
        self.call_decoded(Operation::GetExpressCheckoutDetails, params, |fields| {
            let value = required(fields, "PAYMENTREQUEST_0_AMT")?;
            let value: Decimal = value
                .parse()
                .map_err(|_| TransportError::Decode(format!("invalid amount {value}")))?;
            let currency = required(fields, "PAYMENTREQUEST_0_CURRENCYCODE")?;

            Ok(ExpressCheckoutDetails {
                token: optional(fields, "TOKEN").unwrap_or_else(|| token.to_string()),
                payer_id: optional(fields, "PAYERID"),
                order_total: Amount::new(Currency::new(currency), value),
                notify_url: optional(fields, "PAYMENTREQUEST_0_NOTIFYURL"),
            })
        })
        .await
    }

    async fn do_express_checkout_payment(
        &self,
        request: DoExpressCheckoutPaymentRequest,
    ) -> Result<RemoteResponse<PaymentInfo>, TransportError> {
        let mut params = Vec::new();
        push(&mut params, "TOKEN", &request.token);
        push(&mut params, "PAYERID", &request.payer_id);
        push(
            &mut params,
            "PAYMENTREQUEST_0_PAYMENTACTION",
            request.payment_action.as_str(),
        );
        push_amount(
            &mut params,
            "PAYMENTREQUEST_0_AMT",
            "PAYMENTREQUEST_0_CURRENCYCODE",
            &request.order_total,
        );
        if let Some(notify_url) = &request.notify_url {
            push(&mut params, "PAYMENTREQUEST_0_NOTIFYURL", notify_url);
        }

        self.call_decoded(Operation::DoExpressCheckoutPayment, params, |fields| {
            Ok(PaymentInfo {
                transaction_id: required(fields, "PAYMENTINFO_0_TRANSACTIONID")?,
                payment_status: optional(fields, "PAYMENTINFO_0_PAYMENTSTATUS"),
                pending_reason: optional(fields, "PAYMENTINFO_0_PENDINGREASON"),
            })
        })
        .await
    }

    async fn do_capture(
        &self,
        request: DoCaptureRequest,
    ) -> Result<RemoteResponse<CaptureInfo>, TransportError> {
        let mut params = Vec::new();
        push(&mut params, "AUTHORIZATIONID", &request.authorization_id);
        push_amount(&mut params, "AMT", "CURRENCYCODE", &request.amount);
        push(
            &mut params,
            "COMPLETETYPE",
            if request.complete { "Complete" } else { "NotComplete" },
        );

        self.call_decoded(Operation::DoCapture, params, |fields| {
            Ok(CaptureInfo {
                transaction_id: required(fields, "TRANSACTIONID")?,
            })
        })
        .await
    }

    async fn do_void(
        &self,
        request: DoVoidRequest,
    ) -> Result<RemoteResponse<VoidInfo>, TransportError> {
        let params = vec![(
            "AUTHORIZATIONID".to_string(),
            request.authorization_id.clone(),
        )];
        self.call_decoded(Operation::DoVoid, params, |fields| {
            Ok(VoidInfo {
                authorization_id: optional(fields, "AUTHORIZATIONID")
                    .unwrap_or(request.authorization_id),
            })
        })
        .await
    }

    async fn refund_transaction(
        &self,
        request: RefundTransactionRequest,
    ) -> Result<RemoteResponse<RefundInfo>, TransportError> {
        let mut params = Vec::new();
        push(&mut params, "TRANSACTIONID", &request.transaction_id);
        push(&mut params, "REFUNDTYPE", request.refund_type.as_str());
        push_amount(&mut params, "AMT", "CURRENCYCODE", &request.amount);
        push(&mut params, "REFUNDSOURCE", "any");

        self.call_decoded(Operation::RefundTransaction, params, |fields| {
            Ok(RefundInfo {
                refund_transaction_id: required(fields, "REFUNDTRANSACTIONID")?,
            })
        })
        .await
    }

    fn express_checkout_url(&self, token: &str) -> String {
        express_checkout_url(&self.checkout_base, token)
    }
}
