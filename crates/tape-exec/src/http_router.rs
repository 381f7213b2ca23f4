//! HTTP implementation of the order router.
//!
//! Talks to the broker proxy's per-account discretionary endpoints.
//! Every non-2xx response is turned into a broker rejection carrying
//! the server's `detail` message verbatim.

use crate::error::{ExecError, ExecResult};
use crate::router::{BoxFuture, BracketRequest, ModifyRequest, OrderRequest, OrderRouter};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tape_core::{AccountId, OrderType, Price, Qty, Side, TimeInForce};
use tracing::debug;
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Order router over the broker proxy's REST API.
#[derive(Debug, Clone)]
pub struct HttpOrderRouter {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderPayload<'a> {
    symbol: &'a str,
    side: Side,
    order_type: OrderType,
    qty: Qty,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<Price>,
    time_in_force: TimeInForce,
    client_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyPayload {
    order_type: OrderType,
    qty: Qty,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<Price>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BracketPayload<'a> {
    symbol: &'a str,
    side: Side,
    entry_price: Price,
    take_profit_price: Price,
    stop_loss_price: Price,
    qty: Qty,
    time_in_force: TimeInForce,
    client_id: Uuid,
}

impl HttpOrderRouter {
    pub fn new(base_url: impl Into<String>) -> ExecResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ExecResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn account_url(&self, account_id: &AccountId, tail: &str) -> String {
        format!(
            "{}/api/v1/brokers/accounts/{}/discretionary/{}",
            self.base_url, account_id, tail
        )
    }

    async fn send(&self, request: RequestBuilder) -> ExecResult<()> {
        let response = request.send().await?;
        check_response(response).await
    }
}

/// Map a broker response to Ok or a rejection with the server detail.
async fn check_response(response: Response) -> ExecResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    Err(ExecError::Broker {
        status: status.as_u16(),
        detail,
    })
}

impl OrderRouter for HttpOrderRouter {
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ExecResult<()>> {
        Box::pin(async move {
            let url = self.account_url(&request.account_id, "orders");
            debug!(%url, side = %request.side, "placing order");
            let payload = OrderPayload {
                symbol: &request.symbol,
                side: request.side,
                order_type: request.order_type,
                qty: request.quantity,
                limit_price: request.limit_price,
                stop_price: request.stop_price,
                time_in_force: request.time_in_force,
                client_id: request.client_id,
            };
            self.send(self.client.post(&url).json(&payload)).await
        })
    }

    fn modify_order(&self, request: ModifyRequest) -> BoxFuture<'_, ExecResult<()>> {
        Box::pin(async move {
            let url = self.account_url(
                &request.account_id,
                &format!("orders/{}", request.order_id),
            );
            debug!(%url, order_type = %request.order_type, "modifying order");
            let payload = ModifyPayload {
                order_type: request.order_type,
                qty: request.quantity,
                limit_price: request.limit_price,
                stop_price: request.stop_price,
                price: request.price,
            };
            self.send(
                self.client
                    .request(Method::PATCH, &url)
                    .json(&payload),
            )
            .await
        })
    }

    fn cancel_order<'a>(
        &'a self,
        account_id: &'a AccountId,
        order_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            let url = self.account_url(account_id, &format!("orders/{order_id}"));
            debug!(%url, "cancelling order");
            self.send(self.client.delete(&url)).await
        })
    }

    fn close_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        position_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            let url = self.account_url(account_id, &format!("positions/{position_id}/close"));
            debug!(%url, "closing position");
            self.send(self.client.post(&url)).await
        })
    }

    fn reverse_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        position_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            let url = self.account_url(account_id, &format!("positions/{position_id}/reverse"));
            debug!(%url, "reversing position");
            self.send(self.client.post(&url)).await
        })
    }

    fn place_bracket(&self, request: BracketRequest) -> BoxFuture<'_, ExecResult<()>> {
        Box::pin(async move {
            let url = self.account_url(&request.account_id, "bracket-order");
            debug!(%url, side = %request.side, "placing bracket order");
            let payload = BracketPayload {
                symbol: &request.symbol,
                side: request.side,
                entry_price: request.entry_price,
                take_profit_price: request.tp_price,
                stop_loss_price: request.sl_price,
                qty: request.quantity,
                time_in_force: request.time_in_force,
                client_id: request.client_id,
            };
            self.send(self.client.post(&url).json(&payload)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_url_shapes() {
        let router = HttpOrderRouter::new("https://proxy.example.com/").unwrap();
        let account = AccountId::new("ACC-1");
        assert_eq!(
            router.account_url(&account, "orders"),
            "https://proxy.example.com/api/v1/brokers/accounts/ACC-1/discretionary/orders"
        );
        assert_eq!(
            router.account_url(&account, "bracket-order"),
            "https://proxy.example.com/api/v1/brokers/accounts/ACC-1/discretionary/bracket-order"
        );
    }

    #[test]
    fn test_order_payload_shape() {
        let payload = OrderPayload {
            symbol: "NQ",
            side: Side::Buy,
            order_type: OrderType::Limit,
            qty: Qty::new(dec!(2)),
            limit_price: Some(Price::new(dec!(21000.25))),
            stop_price: None,
            time_in_force: TimeInForce::GoodTilCancelled,
            client_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["side"], "buy");
        assert_eq!(json["orderType"], "LIMIT");
        assert_eq!(json["timeInForce"], "GTC");
        // Absent stop price is omitted entirely
        assert!(json.get("stopPrice").is_none());
    }

    #[test]
    fn test_modify_payload_always_carries_qty_and_type() {
        let payload = ModifyPayload {
            order_type: OrderType::Stop,
            qty: Qty::new(dec!(1)),
            limit_price: None,
            stop_price: Some(Price::new(dec!(20990))),
            price: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["orderType"], "STOP");
        assert_eq!(json["qty"], "1");
        assert_eq!(json["stopPrice"], "20990");
    }
}
