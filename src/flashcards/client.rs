use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::api_types::{ApiCardRow, ApiErrorBody, ApiSetRow, NO_ROWS_CODE};
use super::types::CardSet;
use super::RemoteStore;
use crate::error::{RemoteError, RemoteResult};

const SETS_TABLE: &str = "flashcard_sets";
const CARDS_TABLE: &str = "flashcards";

/// Upsert on primary key and skip echoing rows back.
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// REST client for the shared set and card tables
#[derive(Clone)]
pub struct SupabaseClient {
  base: Url,
  key: String,
  http: reqwest::Client,
}

impl std::fmt::Debug for SupabaseClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SupabaseClient")
      .field("base", &self.base.as_str())
      .field("key", &"[REDACTED]")
      .finish()
  }
}

impl SupabaseClient {
  pub fn new(endpoint: &str, key: impl Into<String>) -> RemoteResult<Self> {
    let key = key.into();
    if key.trim().is_empty() {
      return Err(RemoteError::InvalidConfiguration(
        "access key must not be empty".to_string(),
      ));
    }

    let mut base = Url::parse(endpoint.trim())
      .map_err(|e| RemoteError::InvalidConfiguration(format!("bad endpoint {endpoint}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
      return Err(RemoteError::InvalidConfiguration(
        "endpoint must use http:// or https://".to_string(),
      ));
    }
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    Ok(Self {
      base,
      key,
      http: reqwest::Client::builder().build()?,
    })
  }

  fn table_url(&self, table: &str, query: &[(&str, &str)]) -> RemoteResult<Url> {
    let mut url = self
      .base
      .join(&format!("rest/v1/{table}"))
      .map_err(|e| RemoteError::InvalidConfiguration(e.to_string()))?;
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self
      .http
      .request(method, url)
      .header("apikey", &self.key)
      .bearer_auth(&self.key)
      .header(header::ACCEPT, "application/json")
  }

  async fn send(&self, builder: RequestBuilder) -> RemoteResult<Response> {
    let response = builder.send().await?;
    if response.status().is_success() {
      return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = parsed
      .message
      .or(parsed.details)
      .or(parsed.hint)
      .unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
          format!("HTTP {status}")
        } else {
          trimmed.to_string()
        }
      });

    Err(RemoteError::Api {
      status,
      code: parsed.code,
      message,
    })
  }

  async fn fetch_rows<T: DeserializeOwned>(
    &self,
    table: &str,
    query: &[(&str, &str)],
  ) -> RemoteResult<Vec<T>> {
    let url = self.table_url(table, query)?;
    let response = self.send(self.request(Method::GET, url)).await?;
    response
      .json()
      .await
      .map_err(|e| RemoteError::Decode(format!("{table}: {e}")))
  }

  /// Cards of one set in creation order
  async fn fetch_cards(&self, set_id: &str) -> RemoteResult<Vec<ApiCardRow>> {
    let filter = format!("eq.{set_id}");
    self
      .fetch_rows(
        CARDS_TABLE,
        &[
          ("select", "*"),
          ("set_id", filter.as_str()),
          ("order", "created_at.asc"),
        ],
      )
      .await
  }

  async fn assemble(&self, row: ApiSetRow) -> RemoteResult<CardSet> {
    let cards = self.fetch_cards(&row.id).await?;
    let id = row.id.clone();
    row
      .into_set(cards)
      .map_err(|e| RemoteError::Decode(format!("set {id}: {e}")))
  }

  async fn upsert<B: serde::Serialize + ?Sized>(&self, table: &str, body: &B) -> RemoteResult<()> {
    let url = self.table_url(table, &[])?;
    self
      .send(
        self
          .request(Method::POST, url)
          .header("Prefer", PREFER_UPSERT)
          .json(body),
      )
      .await?;
    Ok(())
  }

  async fn delete_where(&self, table: &str, query: &[(&str, &str)]) -> RemoteResult<()> {
    let url = self.table_url(table, query)?;
    self.send(self.request(Method::DELETE, url)).await?;
    Ok(())
  }

  /// Whether the service answers at all. Any HTTP response counts.
  pub async fn ping(&self) -> bool {
    let Ok(url) = self.base.join("rest/v1/") else {
      return false;
    };
    self.request(Method::HEAD, url).send().await.is_ok()
  }
}

#[async_trait]
impl RemoteStore for SupabaseClient {
  async fn list_sets(&self) -> RemoteResult<Vec<CardSet>> {
    let rows: Vec<ApiSetRow> = self
      .fetch_rows(SETS_TABLE, &[("select", "*"), ("order", "created_at.desc")])
      .await?;
    tracing::debug!(count = rows.len(), "fetched set rows");

    try_join_all(rows.into_iter().map(|row| self.assemble(row))).await
  }

  async fn get_set(&self, id: &str) -> RemoteResult<Option<CardSet>> {
    let filter = format!("eq.{id}");
    let rows = self
      .fetch_rows::<ApiSetRow>(SETS_TABLE, &[("select", "*"), ("id", filter.as_str())])
      .await;

    let row = match rows {
      Ok(rows) => rows.into_iter().next(),
      Err(RemoteError::Api { code: Some(code), .. }) if code == NO_ROWS_CODE => None,
      Err(e) => return Err(e),
    };

    match row {
      Some(row) => Ok(Some(self.assemble(row).await?)),
      None => Ok(None),
    }
  }

  async fn save_set(&self, set: &CardSet) -> RemoteResult<()> {
    self.upsert(SETS_TABLE, &[ApiSetRow::from_set(set)]).await?;

    // New cards go in before old ones are pruned, so an interrupted save
    // leaves extra cards behind rather than none.
    if !set.cards.is_empty() {
      let rows: Vec<ApiCardRow> = set
        .cards
        .iter()
        .enumerate()
        .map(|(position, card)| ApiCardRow::from_card(set, position, card))
        .collect();
      self.upsert(CARDS_TABLE, rows.as_slice()).await?;
    }

    let set_filter = format!("eq.{}", set.id);
    if set.cards.is_empty() {
      self
        .delete_where(CARDS_TABLE, &[("set_id", set_filter.as_str())])
        .await?;
    } else {
      let ids = set.cards.iter().map(|card| card.id.as_str());
      let keep = format!("not.in.({})", quoted_list(ids));
      self
        .delete_where(CARDS_TABLE, &[("set_id", set_filter.as_str()), ("id", keep.as_str())])
        .await?;
    }

    tracing::info!(set_id = %set.id, cards = set.cards.len(), "saved set remotely");
    Ok(())
  }

  async fn delete_set(&self, id: &str) -> RemoteResult<()> {
    let set_filter = format!("eq.{id}");
    // Cards first, they reference the set
    self
      .delete_where(CARDS_TABLE, &[("set_id", set_filter.as_str())])
      .await?;
    self.delete_where(SETS_TABLE, &[("id", set_filter.as_str())]).await?;

    tracing::info!(set_id = %id, "deleted set remotely");
    Ok(())
  }
}

/// Values for an `in.(...)` filter, double-quoted so reserved characters in
/// ids survive.
fn quoted_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
  values
    .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
    .collect::<Vec<_>>()
    .join(",")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::flashcards::Card;
  use pretty_assertions::assert_eq;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  const KEY: &str = "anon-key";

  async fn setup() -> (MockServer, SupabaseClient) {
    let server = MockServer::start().await;
    let client = SupabaseClient::new(&server.uri(), KEY).unwrap();
    (server, client)
  }

  fn set_row(id: &str, title: &str) -> serde_json::Value {
    json!({
      "id": id,
      "title": title,
      "description": null,
      "created_at": "2024-01-01T00:00:00+00:00",
      "updated_at": "2024-01-02T00:00:00+00:00"
    })
  }

  fn card_row(id: &str, set_id: &str, question: &str, answer: &str) -> serde_json::Value {
    json!({
      "id": id,
      "set_id": set_id,
      "question": question,
      "question_image": null,
      "answer": answer,
      "answer_image": null,
      "created_at": "2024-01-01T00:00:00+00:00"
    })
  }

  #[test]
  fn test_new_rejects_bad_configuration() {
    assert!(SupabaseClient::new("ftp://example.com", KEY).is_err());
    assert!(SupabaseClient::new("not a url", KEY).is_err());
    assert!(SupabaseClient::new("https://example.com", " ").is_err());
  }

  #[test]
  fn test_debug_redacts_key() {
    let client = SupabaseClient::new("https://example.com", "secret").unwrap();
    let debug = format!("{client:?}");
    assert!(!debug.contains("secret"));
  }

  #[test]
  fn test_table_url_keeps_base_path() {
    let client = SupabaseClient::new("https://example.com/proxy", KEY).unwrap();
    let url = client.table_url(SETS_TABLE, &[("select", "*")]).unwrap();
    assert_eq!(
      url.as_str(),
      "https://example.com/proxy/rest/v1/flashcard_sets?select=*"
    );
  }

  #[tokio::test]
  async fn test_list_sets_assembles_cards() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcard_sets"))
      .and(query_param("order", "created_at.desc"))
      .and(header("apikey", KEY))
      .and(header("authorization", "Bearer anon-key"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!([set_row("s2", "Newer"), set_row("s1", "Older")])),
      )
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param("set_id", "eq.s1"))
      .and(query_param("order", "created_at.asc"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        card_row("c1", "s1", "Capital of Sweden?", "Stockholm"),
        card_row("c2", "s1", "Capital of Norway?", "Oslo"),
      ])))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param("set_id", "eq.s2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let sets = client.list_sets().await.unwrap();
    let titles: Vec<_> = sets.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
    assert!(sets[0].cards.is_empty());
    assert_eq!(sets[1].cards[1].answer, "Oslo");
    assert_eq!(sets[1].description, "");
  }

  #[tokio::test]
  async fn test_list_sets_propagates_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcard_sets"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({
        "code": "XX000",
        "message": "boom"
      })))
      .mount(&server)
      .await;

    let err = client.list_sets().await.unwrap_err();
    assert!(matches!(
      err,
      RemoteError::Api { status: 500, ref message, .. } if message == "boom"
    ));
  }

  #[tokio::test]
  async fn test_get_set_absent_is_not_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcard_sets"))
      .and(query_param("id", "eq.missing"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    assert_eq!(client.get_set("missing").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_get_set_no_rows_code_is_absent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcard_sets"))
      .respond_with(ResponseTemplate::new(406).set_body_json(json!({
        "code": "PGRST116",
        "message": "JSON object requested, multiple (or no) rows returned"
      })))
      .mount(&server)
      .await;

    assert_eq!(client.get_set("missing").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_save_set_upserts_then_prunes() {
    let (server, client) = setup().await;
    let set = CardSet::new(
      "Capitals",
      "",
      vec![Card::new("Capital of Sweden?", "Stockholm")],
    );
    let card_id = set.cards[0].id.clone();

    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcard_sets"))
      .and(header_exists("prefer"))
      .respond_with(ResponseTemplate::new(201))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcards"))
      .and(body_json(json!([{
        "id": card_id,
        "set_id": set.id,
        "question": "Capital of Sweden?",
        "question_image": null,
        "answer": "Stockholm",
        "answer_image": null,
        "created_at": crate::flashcards::api_types::format_timestamp(set.updated_at),
      }])))
      .respond_with(ResponseTemplate::new(201))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param("set_id", format!("eq.{}", set.id)))
      .and(query_param("id", format!("not.in.(\"{card_id}\")")))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    client.save_set(&set).await.unwrap();
  }

  #[tokio::test]
  async fn test_save_set_stops_before_prune_when_insert_fails() {
    let (server, client) = setup().await;
    let set = CardSet::new("Capitals", "", vec![Card::new("q", "a")]);

    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcard_sets"))
      .respond_with(ResponseTemplate::new(201))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcards"))
      .respond_with(ResponseTemplate::new(400).set_body_string("bad card"))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .respond_with(ResponseTemplate::new(204))
      .expect(0)
      .mount(&server)
      .await;

    let err = client.save_set(&set).await.unwrap_err();
    assert!(matches!(err, RemoteError::Api { status: 400, .. }));
  }

  #[tokio::test]
  async fn test_save_empty_set_clears_cards() {
    let (server, client) = setup().await;
    let set = CardSet::new("Empty", "", Vec::new());

    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcard_sets"))
      .respond_with(ResponseTemplate::new(201))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcards"))
      .respond_with(ResponseTemplate::new(201))
      .expect(0)
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param("set_id", format!("eq.{}", set.id)))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    client.save_set(&set).await.unwrap();
  }

  #[tokio::test]
  async fn test_delete_set_removes_cards_then_set() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param("set_id", "eq.s1"))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/rest/v1/flashcard_sets"))
      .and(query_param("id", "eq.s1"))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    client.delete_set("s1").await.unwrap();
  }

  #[test]
  fn test_quoted_list_escapes_reserved_characters() {
    let ids = ["plain", "a,b(c)", "say \"hi\"", "back\\slash"];
    assert_eq!(
      quoted_list(ids.into_iter()),
      r#""plain","a,b(c)","say \"hi\"","back\\slash""#
    );
  }

  #[tokio::test]
  async fn test_prune_filter_quotes_card_ids() {
    let (server, client) = setup().await;
    let mut set = CardSet::new("Odd ids", "", vec![Card::new("q1", "a1"), Card::new("q2", "a2")]);
    set.cards[0].id = "x,(y)".to_string();

    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(201))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param(
        "id",
        format!("not.in.(\"x,(y)\",\"{}\")", set.cards[1].id),
      ))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    client.save_set(&set).await.unwrap();
  }

  #[tokio::test]
  async fn test_images_survive_save_and_get() {
    let (server, client) = setup().await;
    let set = CardSet::new(
      "Pictures",
      "Flags",
      vec![
        Card::new("Which flag?", "Sweden").with_question_image("data:image/png;base64,iVBORw0KGgo="),
        Card::new("Capital?", "Oslo").with_answer_image("https://img.example/oslo.jpg"),
      ],
    );
    let card_rows: Vec<serde_json::Value> = set
      .cards
      .iter()
      .enumerate()
      .map(|(position, card)| serde_json::to_value(ApiCardRow::from_card(&set, position, card)).unwrap())
      .collect();
    assert_eq!(card_rows[0]["question_image"], "data:image/png;base64,iVBORw0KGgo=");
    assert_eq!(card_rows[1]["answer_image"], "https://img.example/oslo.jpg");

    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcard_sets"))
      .respond_with(ResponseTemplate::new(201))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/v1/flashcards"))
      .and(body_json(&card_rows))
      .respond_with(ResponseTemplate::new(201))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;
    client.save_set(&set).await.unwrap();

    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcard_sets"))
      .and(query_param("id", format!("eq.{}", set.id)))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([ApiSetRow::from_set(&set)])))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/v1/flashcards"))
      .and(query_param("set_id", format!("eq.{}", set.id)))
      .respond_with(ResponseTemplate::new(200).set_body_json(&card_rows))
      .mount(&server)
      .await;

    assert_eq!(client.get_set(&set.id).await.unwrap(), Some(set));
  }

  #[tokio::test]
  async fn test_ping() {
    let (server, client) = setup().await;
    Mock::given(method("HEAD"))
      .respond_with(ResponseTemplate::new(200))
      .mount(&server)
      .await;
    assert!(client.ping().await);

    // Bind then release a port so nothing is listening on it
    let closed = std::net::TcpListener::bind("127.0.0.1:0")
      .unwrap()
      .local_addr()
      .unwrap();
    let unreachable = SupabaseClient::new(&format!("http://{closed}"), KEY).unwrap();
    assert!(!unreachable.ping().await);
  }
}
