use pipegraph_core::{Draft, ElementKind, ElementRef, Error, PropertyGraph, Value};

fn id(s: &str) -> String {
    s.to_string()
}

fn graph_with(ids: &[&str]) -> PropertyGraph {
    let graph = PropertyGraph::new();
    for vertex in ids {
        graph.add_vertex(Draft::new().with_id(*vertex)).unwrap();
    }
    graph
}

#[test]
fn test_explicit_ids_resolve_to_their_vertices() {
    let ids = ["a", "b", "c", "d"];
    let graph = graph_with(&ids);

    for vertex in ids {
        let found = graph.vertex_by_id(&id(vertex)).unwrap().unwrap();
        assert_eq!(found.id(), vertex);
    }

    let err = graph.add_vertex(Draft::new().with_id("c")).unwrap_err();
    assert!(matches!(err, Error::DuplicateIdentifier { .. }));
    assert_eq!(graph.number_of_vertices().unwrap(), ids.len());
}

#[test]
fn test_edge_to_foreign_vertex_leaves_source_untouched() {
    let graph = graph_with(&["u"]);
    let before = graph.vertex_by_id(&id("u")).unwrap().unwrap();

    let err = graph.add_edge(&id("u"), "knows", &id("v")).unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownReference {
            kind: ElementKind::Vertex,
            ..
        }
    ));

    let after = graph.vertex_by_id(&id("u")).unwrap().unwrap();
    assert_eq!(before.adjacency(), after.adjacency());
}

#[test]
fn test_cascade_removes_exactly_incident_edges() {
    let graph = graph_with(&["hub", "x", "y", "z"]);
    graph.add_edge(&id("hub"), "to", &id("x")).unwrap();
    graph.add_edge(&id("y"), "to", &id("hub")).unwrap();
    graph.add_edge(&id("hub"), "to", &id("z")).unwrap();
    graph.add_edge(&id("x"), "to", &id("y")).unwrap();

    let edges_before = graph.number_of_edges().unwrap();
    let vertices_before = graph.number_of_vertices().unwrap();
    let incident = graph
        .vertex_by_id(&id("hub"))
        .unwrap()
        .unwrap()
        .adjacency()
        .unwrap()
        .degree();

    graph.remove_vertices_by_id(vec![id("hub")]).unwrap();

    assert_eq!(graph.number_of_edges().unwrap(), edges_before - incident);
    assert_eq!(graph.number_of_vertices().unwrap(), vertices_before - 1);
}

#[test]
fn test_knows_scenario() {
    let graph = graph_with(&["A", "B"]);
    graph.add_edge(&id("A"), "knows", &id("B")).unwrap();

    assert_eq!(graph.number_of_vertices().unwrap(), 2);
    assert_eq!(graph.number_of_edges().unwrap(), 1);

    graph.remove_vertices_by_id(vec![id("A")]).unwrap();

    assert_eq!(graph.number_of_vertices().unwrap(), 1);
    assert_eq!(graph.number_of_edges().unwrap(), 0);
    let b = graph.vertex_by_id(&id("B")).unwrap().unwrap();
    assert_eq!(b.in_edges().count(), 0);
}

#[test]
fn test_alice_scenario() {
    let graph = graph_with(&["A"]);
    let a = ElementRef::Vertex(id("A"));

    graph.set_property(&a, id("name"), Value::from("Alice")).unwrap();
    graph.set_property(&a, id("name"), Value::from("Alicia")).unwrap();
    assert_eq!(
        graph.property(&a, &id("name")).unwrap(),
        Some(Value::from("Alicia"))
    );

    graph.remove_property(&a, &id("name")).unwrap();
    assert!(graph.property(&a, &id("name")).unwrap().is_none());
}

#[test]
fn test_filtered_counts_agree_with_enumeration() {
    let graph = PropertyGraph::new();
    for age in [17i64, 25, 31, 44, 12] {
        graph
            .add_vertex(Draft::new().with_label("person").with_property("age", age))
            .unwrap();
    }
    graph.add_vertex(Draft::new().with_label("city")).unwrap();

    let adult = |v: &pipegraph_core::Element<pipegraph_core::DefaultTypes>| {
        v.property(&"age".to_string())
            .and_then(Value::as_int)
            .map_or(false, |age| age >= 18)
    };

    assert_eq!(graph.number_of_vertices().unwrap(), graph.vertices().count());
    assert_eq!(
        graph.number_of_vertices_where(adult).unwrap(),
        graph.vertices_where(adult).count()
    );
    assert_eq!(graph.number_of_vertices_where(adult).unwrap(), 3);
    assert_eq!(graph.vertices_by_label(vec![id("city")]).count(), 1);
}

#[test]
fn test_remove_where_keeps_adjacency_symmetric() {
    let graph = graph_with(&["a", "b", "c"]);
    graph.add_edge(&id("a"), "weak", &id("b")).unwrap();
    graph.add_edge(&id("b"), "strong", &id("c")).unwrap();
    graph.add_edge(&id("c"), "weak", &id("a")).unwrap();

    let removed = graph.remove_edges_where(|e| e.label() == "weak").unwrap();
    assert_eq!(removed.len(), 2);

    for vertex in graph.vertices() {
        for edge_id in vertex.out_edges() {
            let edge = graph.edge_by_id(edge_id).unwrap().unwrap();
            assert_eq!(edge.out_vertex(), Some(vertex.id()));
        }
        for edge_id in vertex.in_edges() {
            let edge = graph.edge_by_id(edge_id).unwrap().unwrap();
            assert_eq!(edge.in_vertex(), Some(vertex.id()));
        }
    }
    assert_eq!(graph.number_of_edges().unwrap(), 1);
}

#[test]
fn test_shut_down_graph_refuses_every_mutation() {
    let graph = graph_with(&["a", "b"]);
    graph.add_edge(&id("a"), "knows", &id("b")).unwrap();
    graph.shutdown("done").unwrap();

    assert!(matches!(graph.add_vertex(Draft::new()), Err(Error::ShutDown)));
    assert!(matches!(graph.add_edge(&id("a"), "knows", &id("b")), Err(Error::ShutDown)));
    assert!(matches!(graph.remove_vertices_by_id(vec![id("a")]), Err(Error::ShutDown)));
    assert!(matches!(graph.remove_where(ElementKind::Edge, |_| true), Err(Error::ShutDown)));
    assert!(matches!(
        graph.set_property(&ElementRef::Graph, "name".to_string(), Value::from("g")),
        Err(Error::ShutDown)
    ));
    assert!(matches!(
        graph.set_property(&ElementRef::Vertex(id("a")), "age".to_string(), Value::Int(1)),
        Err(Error::ShutDown)
    ));
    assert_eq!(graph.number_of_vertices().unwrap(), 0);
}

#[test]
fn test_multi_and_hyper_edges_need_existing_vertices() {
    let graph = graph_with(&["a", "b"]);

    let err = graph
        .add_multi_edge(&id("a"), vec![id("b"), id("ghost")], Draft::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownReference { kind: ElementKind::Vertex, .. }));

    let err = graph
        .add_hyper_edge(vec![id("a"), id("ghost")], Draft::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownReference { kind: ElementKind::Vertex, .. }));

    assert_eq!(graph.number_of_multi_edges().unwrap(), 0);
    assert_eq!(graph.number_of_hyper_edges().unwrap(), 0);
    let a = graph.vertex_by_id(&id("a")).unwrap().unwrap();
    assert_eq!(a.out_edges().count(), 0);
}
