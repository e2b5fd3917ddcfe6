use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::credentials::Credential;
use crate::error::{FetchError, Result};
use crate::paging::{Page, PageRequest, PageSource};
use crate::recipe::{RecipeList, RecipeSummary};

/// Accepted list bodies: a Spring-style page envelope or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Envelope { content: Vec<T> },
    Items(Vec<T>),
}

/// Parse a list response body.
pub fn decode_page<T: DeserializeOwned>(body: &[u8]) -> std::result::Result<Page<T>, FetchError> {
    let items = match serde_json::from_slice::<ListBody<T>>(body)? {
        ListBody::Envelope { content } => content,
        ListBody::Items(items) => items,
    };
    Ok(Page::new(items))
}

/// One list endpoint served over HTTP.
pub struct HttpListSource<T> {
    client: Client,
    url: Url,
    name: String,
    extra_query: Vec<(&'static str, String)>,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpListSource<T> {
    pub fn new(client: Client, url: Url, name: impl Into<String>) -> Self {
        Self {
            client,
            url,
            name: name.into(),
            extra_query: Vec::new(),
            _item: PhantomData,
        }
    }

    /// Add a fixed query parameter sent with every page request.
    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.extra_query.push((key, value.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl HttpListSource<RecipeSummary> {
    /// Source for one of the recipe lists, resolved against the API root.
    pub fn recipes(client: Client, base_url: &Url, list: &RecipeList) -> Result<Self> {
        let url = base_url.join(&list.path())?;
        let source = list
            .extra_query()
            .into_iter()
            .fold(Self::new(client, url, list.name()), |source, (key, value)| {
                source.with_query(key, value)
            });
        Ok(source)
    }
}

#[async_trait]
impl<T> PageSource<T> for HttpListSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(
        &self,
        request: &PageRequest,
        credential: &Credential,
    ) -> std::result::Result<Page<T>, FetchError> {
        let builder = self
            .client
            .get(self.url.clone())
            .query(&self.extra_query)
            .query(&request.query_pairs());

        let response = credential.authorize(builder).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = response.bytes().await?;
        decode_page(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> Client {
        crate::http::build_client(&crate::config::ClientConfig::default()).unwrap()
    }

    #[test]
    fn test_decode_envelope() {
        let page: Page<RecipeSummary> = decode_page(
            br#"{"content":[{"id":1,"title":"Pho"},{"id":2,"title":"Ramen"}],"totalPages":3}"#,
        )
        .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.items[1].title, "Ramen");
    }

    #[test]
    fn test_decode_bare_array() {
        let page: Page<RecipeSummary> = decode_page(br#"[{"id":1,"title":"Pho"}]"#).unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        let result: std::result::Result<Page<RecipeSummary>, _> =
            decode_page(br#"{"error":"oops"}"#);
        assert!(matches!(result, Err(FetchError::Decode(_))));

        let result: std::result::Result<Page<RecipeSummary>, _> = decode_page(b"<html>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_request_url() {
        let base = Url::parse("https://recipes.example.com/api/").unwrap();
        let source = HttpListSource::recipes(
            test_client(),
            &base,
            &RecipeList::Search {
                query: "tofu".to_string(),
            },
        )
        .unwrap();
        assert_eq!(source.name(), "search");
        assert_eq!(
            source.url().as_str(),
            "https://recipes.example.com/api/recipes/search"
        );

        let request = PageRequest {
            cursor: Default::default(),
            page_size: 10,
            sort_key: "createdAt,desc".to_string(),
        };
        let built = source
            .client
            .get(source.url.clone())
            .query(&source.extra_query)
            .query(&request.query_pairs())
            .build()
            .unwrap();
        assert_eq!(
            built.url().query(),
            Some("query=tofu&page=0&size=10&sort=createdAt%2Cdesc")
        );
    }
}
