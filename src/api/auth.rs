//! Session endpoints.

use serde::de::IgnoredAny;

use super::AdminClient;
use crate::Result;
use crate::http::HttpClient;
use crate::keys;
use crate::query::{Mutation, QueryOptions, Subscription};
use crate::types::{AuthenticateRequest, IsAuthenticatedResponse};

pub async fn is_authenticated(http: &HttpClient) -> Result<IsAuthenticatedResponse> {
    http.get("auth/is-authenticated").await
}

pub async fn authenticate(http: &HttpClient, password: &str) -> Result<()> {
    let request = AuthenticateRequest {
        password: password.to_string(),
    };
    http.post::<IgnoredAny, _>("auth/authenticate", &request)
        .await
        .map(|_| ())
}

pub async fn logout(http: &HttpClient) -> Result<()> {
    http.post_empty::<IgnoredAny>("auth/logout").await.map(|_| ())
}

pub fn is_authenticated_query(http: &HttpClient) -> QueryOptions<bool> {
    let http = http.clone();
    QueryOptions::new(keys::auth::is_authenticated(), move || {
        let http = http.clone();
        async move { is_authenticated(&http).await.map(|r| r.authenticated) }
    })
}

impl AdminClient {
    pub fn is_authenticated(&self) -> Subscription<bool> {
        self.queries.subscribe(is_authenticated_query(&self.http))
    }

    /// Log in with the admin password.
    pub fn authenticate(&self) -> Mutation<String, ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "authenticate", move |password: String| {
            let http = http.clone();
            async move { authenticate(&http, &password).await }
        })
        .invalidates(|_| vec![keys::auth::is_authenticated().into()])
    }

    pub fn logout(&self) -> Mutation<(), ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "logout", move |()| {
            let http = http.clone();
            async move { logout(&http).await }
        })
        .invalidates(|_| vec![keys::auth::is_authenticated().into()])
    }
}
