// XML codec: namespace-agnostic reading, object-tree building

use adt_client::core::errors::ErrorKind;
use adt_client::xml::{self, XmlNode};
use serde_json::json;

#[test]
fn test_find_elements_matches_any_prefix() {
    for doc in ["<a:foo>1</a:foo>", "<b:foo>1</b:foo>", "<foo>1</foo>"] {
        let tree = xml::parse(doc).unwrap();
        let found = xml::find_elements(&tree, "foo");
        assert_eq!(found.len(), 1, "{}", doc);
        assert_eq!(found[0].text(), Some("1"));
    }
}

#[test]
fn test_lookup_across_mixed_prefixes() {
    let tree = xml::parse(
        r#"<adtcore:objectReferences xmlns:adtcore="http://www.sap.com/adt/core">
             <adtcore:objectReference adtcore:name="Z_ONE"/>
             <objectReference name="Z_TWO"/>
           </adtcore:objectReferences>"#,
    )
    .unwrap();

    let names: Vec<&str> = xml::find_elements(&tree, "objectReference")
        .into_iter()
        .filter_map(|node| xml::get_attribute(node, "name"))
        .collect();
    assert_eq!(names, vec!["Z_ONE", "Z_TWO"]);
    assert_eq!(xml::get_attribute(&tree, "adtcore"), None);
}

#[test]
fn test_build_program_metadata() {
    let text = xml::build(&json!({
        "program:abapProgram": {
            "@_xmlns:program": "http://www.sap.com/adt/programs/programs",
            "@_xmlns:adtcore": "http://www.sap.com/adt/core",
            "@_adtcore:name": "Z_REPORT",
            "@_adtcore:description": "Report <demo> & test",
            "adtcore:packageRef": { "@_adtcore:name": "$TMP" },
            "adtcore:responsible": null
        }
    }))
    .unwrap();

    assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(text.contains("Report &lt;demo&gt; &amp; test"));
    assert!(!text.contains("responsible"));

    let tree: XmlNode = xml::parse(&text).unwrap();
    assert_eq!(tree.local_name(), "abapProgram");
    assert_eq!(tree.attribute("description"), Some("Report <demo> & test"));
    let package = tree.child("packageRef").unwrap();
    assert_eq!(package.attribute("name"), Some("$TMP"));
}

#[test]
fn test_build_rejects_trees_without_one_root() {
    for tree in [
        json!("text"),
        json!([1, 2]),
        json!({}),
        json!({ "root": null }),
        json!({ "a": 1, "b": 2 }),
        json!({ "root": [1, 2] }),
    ] {
        let err = xml::build(&tree).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Xml);
    }
}

#[test]
fn test_parse_rejects_malformed_documents() {
    for doc in ["", "<open>", "<a></b>", "<a/><b/>"] {
        assert!(xml::parse(doc).is_err(), "{:?} should not parse", doc);
    }
}
