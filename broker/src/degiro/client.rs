//! DeGiro web API client.

use std::time::Duration;

use chrono::NaiveDate;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{
    ClientInfo, DataEnvelope, LoginRequest, LoginResponse, ProductsInfoData, ServiceUrls,
    TransactionEntry, UpdateResponse,
};
use crate::error::BrokerError;
use crate::types::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://trader.degiro.nl";

const LOGIN_PATH: &str = "/login/secure/login";
const LOGIN_TOTP_PATH: &str = "/login/secure/login/totp";
const CONFIG_PATH: &str = "/login/secure/config";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Blocking DeGiro client bound to one session.
pub struct DegiroClient {
    client: Client,
    session_id: String,
    urls: ServiceUrls,
}

impl DegiroClient {
    /// Log in and resolve the session's service URLs.
    ///
    /// `one_time_password` is sent to the TOTP endpoint when present.
    pub fn login(
        base_url: &str,
        credentials: &Credentials,
        one_time_password: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BrokerError::Network(format!("failed to build HTTP client: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let path = if one_time_password.is_some() {
            LOGIN_TOTP_PATH
        } else {
            LOGIN_PATH
        };
        let body = LoginRequest {
            username: &credentials.username,
            password: credentials.password.as_str(),
            is_pass_code_reset: false,
            is_redirect_to_mobile: false,
            one_time_password,
        };

        debug!(
            "Logging in to DeGiro as {} (totp: {})",
            credentials.username,
            one_time_password.is_some()
        );

        let resp = client
            .post(format!("{base_url}{path}"))
            .json(&body)
            .send()
            .map_err(|e| network_error("login", e))?;
        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| network_error("login", e))?;
        let session_id = interpret_login(status, &text)?;

        // GET /login/secure/config
        let envelope: DataEnvelope<ServiceUrls> = send_json(
            "config",
            client.get(format!("{base_url}{CONFIG_PATH}")),
            &session_id,
        )?;
        let urls = envelope.data.normalized();
        debug!("DeGiro session opened");

        Ok(Self {
            client,
            session_id,
            urls,
        })
    }

    /// GET {paUrl}client.
    pub fn client_info(&self) -> Result<ClientInfo, BrokerError> {
        let url = format!("{}client", self.urls.pa_url);
        let request = self
            .client
            .get(url)
            .query(&[("sessionId", self.session_id.as_str())]);
        let envelope: DataEnvelope<ClientInfo> = self.get_json("client details", request)?;
        Ok(envelope.data)
    }

    /// GET {reportingUrl}v4/transactions.
    pub fn transactions(
        &self,
        int_account: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionEntry>, BrokerError> {
        let url = format!("{}v4/transactions", self.urls.reporting_url);
        let from = from.format("%d/%m/%Y").to_string();
        let to = to.format("%d/%m/%Y").to_string();
        let account = int_account.to_string();
        debug!("Fetching transactions {from} - {to}");
        let request = self.client.get(url).query(&[
            ("fromDate", from.as_str()),
            ("toDate", to.as_str()),
            ("groupTransactionsByOrder", "false"),
            ("intAccount", account.as_str()),
            ("sessionId", self.session_id.as_str()),
        ]);
        let envelope: DataEnvelope<Vec<TransactionEntry>> =
            self.get_json("transactions", request)?;
        Ok(envelope.data)
    }

    /// POST {productSearchUrl}v5/products/info.
    pub fn products_info(
        &self,
        int_account: i64,
        product_ids: &[String],
    ) -> Result<ProductsInfoData, BrokerError> {
        let url = format!("{}v5/products/info", self.urls.product_search_url);
        let account = int_account.to_string();
        debug!("Fetching info for {} products", product_ids.len());
        let request = self
            .client
            .post(url)
            .query(&[
                ("intAccount", account.as_str()),
                ("sessionId", self.session_id.as_str()),
            ])
            .json(product_ids);
        let envelope: DataEnvelope<ProductsInfoData> = self.get_json("products info", request)?;
        Ok(envelope.data)
    }

    /// GET {tradingUrl}v5/update/{intAccount};jsessionid={sid}?portfolio=0.
    pub fn update(&self, int_account: i64) -> Result<UpdateResponse, BrokerError> {
        let url = format!(
            "{}v5/update/{int_account};jsessionid={}",
            self.urls.trading_url, self.session_id
        );
        let request = self.client.get(url).query(&[("portfolio", "0")]);
        self.get_json("portfolio", request)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T, BrokerError> {
        send_json(what, request, &self.session_id)
    }
}

/// Send with the session cookie, check the status and decode the body.
fn send_json<T: DeserializeOwned>(
    what: &str,
    request: RequestBuilder,
    session_id: &str,
) -> Result<T, BrokerError> {
    let resp = request
        .header("Cookie", format!("JSESSIONID={session_id}"))
        .send()
        .map_err(|e| network_error(what, e))?;
    let resp = check_status(what, resp)?;
    resp.json::<T>()
        .map_err(|e| BrokerError::UnexpectedResponse(format!("failed to parse {what}: {e}")))
}

fn check_status(what: &str, resp: Response) -> Result<Response, BrokerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(BrokerError::Credentials(format!(
            "{what} returned {status}: session rejected"
        ))),
        _ => Err(BrokerError::UnexpectedResponse(format!(
            "{what} returned {status}: {body}"
        ))),
    }
}

fn network_error(what: &str, e: reqwest::Error) -> BrokerError {
    BrokerError::Network(format!("{what} request failed: {e}"))
}

/// Map a login reply to a session id or a tagged error.
///
/// The body is read whatever the HTTP status: DeGiro reports a bad password
/// or a missing one-time password through `status` on a 4xx reply.
pub fn interpret_login(http_status: u16, body: &str) -> Result<String, BrokerError> {
    let parsed: Result<LoginResponse, _> = serde_json::from_str(body);
    let reply = match parsed {
        Ok(reply) => reply,
        Err(_) if matches!(http_status, 401 | 403) => {
            return Err(BrokerError::Credentials(format!("login returned {http_status}")));
        }
        Err(e) => {
            return Err(BrokerError::UnexpectedResponse(format!(
                "failed to parse login response ({http_status}): {e}"
            )));
        }
    };
    let status_text = reply.status_text.unwrap_or_default();
    match reply.status {
        0 => reply
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BrokerError::UnexpectedResponse("login reply without sessionId".into())),
        3 => Err(BrokerError::Credentials(status_text)),
        6 => Err(BrokerError::TotpRequired),
        other => Err(BrokerError::UnexpectedResponse(format!(
            "login status {other}: {status_text}"
        ))),
    }
}
