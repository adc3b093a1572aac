use super::*;
use roxmltree::Document;
use stixgraph_core::REVISION_TIMESTAMP_KEY;

/// Extracts every child carrying an `id`, typed by its first namespaced
/// child; children of `Deferred` go to a processor named `sub`.
struct IdHooks;

impl WalkHooks for IdHooks {
    fn embedding(&mut self, parent: Node<'_, '_>, child: Node<'_, '_>) -> Option<Embedding> {
        if parent.tag_name().name() == "Deferred" {
            return Some(Embedding::Deferred {
                processor: "sub".into(),
                embedded_ns: element_prefix(child).map(str::to_string),
                id_and_revision: self.id_and_revision(child),
            });
        }
        child.attribute("id")?;
        let hint = child
            .children()
            .find(|n| n.is_element() && has_namespace(*n))
            .and_then(element_prefix)
            .map(|p| TypeHint::Namespace(p.to_string()))
            .unwrap_or(TypeHint::Untyped);
        Some(Embedding::Object {
            type_hint: hint,
            id_and_revision: None,
        })
    }

    fn id_and_revision(&self, element: Node<'_, '_>) -> IdAndRevision {
        IdAndRevision::new(
            element.attribute("id").map(str::to_string),
            element.attribute("revision_timestamp").map(str::to_string),
        )
    }
}

const DOC: &str = r#"<a:Root xmlns:a="http://a.example/" xmlns:b="http://b.example/"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" id="a:root">
    <a:Title>  Hello  </a:Title>
    <a:Item id="a:item-1" revision_timestamp="2014-01-01T00:00:00Z">
        <b:Body xsi:type="b:BodyType">text</b:Body>
        <a:Inner id="a:inner-1"><a:Leaf>x</a:Leaf></a:Inner>
    </a:Item>
    <a:Item><a:Leaf>kept inline</a:Leaf></a:Item>
    <a:Deferred><b:Doc id="b:doc-1"/><b:Doc/></a:Deferred>
</a:Root>"#;

#[test]
fn walk_extracts_embeddings_in_preorder() -> anyhow::Result<()> {
    let doc = Document::parse(DOC)?;
    let result = xml_to_dict(doc.root_element(), &mut IdHooks);

    assert_eq!(result.top.id_and_revision.id(), Some("a:root"));
    assert_eq!(result.top.element_name, "Root");

    let ids: Vec<_> = result
        .embedded
        .iter()
        .map(|r| r.id_and_revision.id().unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["a:item-1", "a:inner-1"]);

    let item = &result.embedded[0];
    assert_eq!(item.dict.embedded_type_info(), Some("b"));
    assert_eq!(
        item.id_and_revision.timestamp.as_deref(),
        Some("2014-01-01T00:00:00Z")
    );
    let inner_ref = item.dict.get_map("Inner").expect("reference leaf");
    assert_eq!(inner_ref.attr("idref"), Some("a:inner-1"));
    assert_eq!(inner_ref.embedded_type_info(), Some("a"));
    Ok(())
}

#[test]
fn extracted_child_is_replaced_by_reference_leaf() -> anyhow::Result<()> {
    let doc = Document::parse(DOC)?;
    let result = xml_to_dict(doc.root_element(), &mut IdHooks);
    let top = &result.top.dict;

    assert_eq!(top.namespace_prefix(), Some("a"));
    assert_eq!(top.get_map("Title").and_then(ObjDict::text), Some("Hello"));

    let Some(ObjValue::List(items)) = top.get("Item") else {
        panic!("expected two Item entries");
    };
    let leaf = items[0].as_map().expect("leaf");
    assert_eq!(leaf.attr("idref"), Some("a:item-1"));
    assert_eq!(
        leaf.get_str(REVISION_TIMESTAMP_KEY),
        Some("2014-01-01T00:00:00Z")
    );
    assert_eq!(leaf.namespace_prefix(), Some("a"));
    assert_eq!(leaf.children().count(), 0);

    let inline = items[1].as_map().expect("inline item");
    assert_eq!(
        inline.get_map("Leaf").and_then(ObjDict::text),
        Some("kept inline")
    );
    Ok(())
}

#[test]
fn deferred_children_point_into_the_tree() -> anyhow::Result<()> {
    let doc = Document::parse(DOC)?;
    let result = xml_to_dict(doc.root_element(), &mut IdHooks);

    assert_eq!(result.deferred.len(), 2);
    assert_eq!(result.deferred[0].processor, "sub");
    assert_eq!(result.deferred[0].node.tag_name().name(), "Doc");
    assert_eq!(result.deferred[0].embedded_ns.as_deref(), Some("b"));

    // Only the deferred child with an id leaves a reference behind.
    let deferred = result.top.dict.get_map("Deferred").expect("Deferred");
    let doc_ref = deferred.get_map("Doc").expect("single reference");
    assert_eq!(doc_ref.attr("idref"), Some("b:doc-1"));
    Ok(())
}

#[test]
fn qualified_attributes_keep_their_prefix() -> anyhow::Result<()> {
    let doc = Document::parse(DOC)?;
    let body = doc
        .descendants()
        .find(|n| n.tag_name().name() == "Body")
        .expect("Body");
    let attrs = attribute_map(body);
    assert_eq!(attrs.get("xsi:type").map(String::as_str), Some("b:BodyType"));
    assert_eq!(attribute(body, "xsi:type"), Some("b:BodyType"));

    let dict = element_to_dict(body);
    assert_eq!(dict.attr("xsi:type"), Some("b:BodyType"));
    assert_eq!(dict.text(), Some("text"));
    Ok(())
}

#[test]
fn document_namespaces_are_collected() -> anyhow::Result<()> {
    let doc = Document::parse(DOC)?;
    let mut table = NamespaceTable::new("http://default/");
    collect_namespaces(&doc, &mut table);
    assert_eq!(table.get(Some("b")), Some("http://b.example/"));
    assert_eq!(table.get(None), Some("http://default/"));

    let doc = Document::parse(r#"<Root xmlns="http://override/"/>"#)?;
    collect_namespaces(&doc, &mut table);
    assert_eq!(table.get(None), Some("http://override/"));
    Ok(())
}
