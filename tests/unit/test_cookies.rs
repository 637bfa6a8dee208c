// Cookie store merge semantics

use adt_client::core::models::Response;
use adt_client::session::CookieStore;

use crate::common::test_session;

#[test]
fn test_cookie_merge_never_duplicates_names() {
    let mut store = CookieStore::new();
    store.update(["a=1; Path=/", "b=2"]);
    store.update(["a=3"]);

    let header = store.header();
    assert!(header == "b=2; a=3" || header == "a=3; b=2", "{}", header);
    assert_eq!(header.matches("a=").count(), 1);
}

#[test]
fn test_cookie_attributes_are_not_replayed() {
    let mut store = CookieStore::new();
    store.update(["MYSAPSSO2=AjQx; path=/; domain=.example.com; secure; HttpOnly"]);
    assert_eq!(store.header(), "MYSAPSSO2=AjQx");
}

#[test]
fn test_malformed_cookies_are_ignored() {
    let mut store = CookieStore::new();
    store.update(["", "; path=/", "=orphan"]);
    assert!(store.is_empty());
}

#[test]
fn test_session_absorbs_every_set_cookie() {
    let session = test_session();
    assert!(session.cookie_header().is_none());

    session.absorb_cookies(
        &Response::new(200)
            .with_header("Set-Cookie", "SAP_SESSIONID_DEV_100=one; path=/")
            .with_header("Set-Cookie", "sap-usercontext=sap-client=100; path=/"),
    );
    session.absorb_cookies(
        &Response::new(200).with_header("set-cookie", "SAP_SESSIONID_DEV_100=two; path=/"),
    );

    let cookies = session.cookies();
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies.get("SAP_SESSIONID_DEV_100"), Some("two"));
}
