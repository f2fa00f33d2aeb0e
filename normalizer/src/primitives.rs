// primitives.rs — The auxiliary nodes the normalizer inserts
//
// Four atomic primitives: `control/duplicate` (one value to two),
// `control/join` (two values to one, a special form), `std/id` (identity
// bridge at a compound boundary) and `control/consume` (sink).

use crate::graph::{Node, NodeId, NodeValue, PortMap, PortType, Settings};

pub const DUPLICATE: &str = "control/duplicate";
pub const JOIN: &str = "control/join";
pub const IDENTITY: &str = "std/id";
pub const CONSUME: &str = "control/consume";

const DUPLICATE_VERSION: &str = "0.3.0";
const JOIN_VERSION: &str = "0.3.0";
const IDENTITY_VERSION: &str = "0.1.2";
const CONSUME_VERSION: &str = "0.2.0";

fn ports(entries: &[(&str, &PortType)]) -> PortMap {
    entries
        .iter()
        .map(|(name, ty)| (name.to_string(), (*ty).clone()))
        .collect()
}

fn atomic(
    component: &str,
    version: &str,
    inputs: PortMap,
    outputs: PortMap,
    settings: Settings,
) -> NodeValue {
    NodeValue {
        component: Some(component.to_string()),
        version: Some(version.to_string()),
        input_ports: Some(inputs),
        output_ports: Some(outputs),
        atomic: Some(true),
        settings: Some(settings),
        ..NodeValue::default()
    }
}

/// Tree nodes over a concrete type are marked for monomorphization.
fn tree_settings(ordering: &[&str], ty: &PortType) -> Settings {
    let mut settings = Settings::ordered(ordering);
    if let Some(name) = ty.concrete_name() {
        settings.is_generic = Some(true);
        settings.generic_type = Some(PortType::named(name));
    }
    settings
}

pub fn duplicate(id: NodeId, ty: &PortType, parent: Option<NodeId>) -> Node {
    let value = atomic(
        DUPLICATE,
        DUPLICATE_VERSION,
        ports(&[("in", ty)]),
        ports(&[("d1", ty), ("d2", ty)]),
        tree_settings(&["in", "d1", "d2"], ty),
    );
    Node::new(id, value, parent)
}

pub fn join(id: NodeId, ty: &PortType, parent: Option<NodeId>) -> Node {
    let mut value = atomic(
        JOIN,
        JOIN_VERSION,
        ports(&[("in1", ty), ("in2", ty)]),
        ports(&[("to", ty)]),
        tree_settings(&["in1", "in2", "to"], ty),
    );
    value.special_form = Some(true);
    Node::new(id, value, parent)
}

pub fn identity(id: NodeId, input: &PortType, output: &PortType, parent: NodeId) -> Node {
    let value = atomic(
        IDENTITY,
        IDENTITY_VERSION,
        ports(&[("input", input)]),
        ports(&[("output", output)]),
        Settings::ordered(&["input", "output"]),
    );
    Node::new(id, value, Some(parent))
}

pub fn consume(id: NodeId, ty: &PortType, parent: Option<NodeId>) -> Node {
    let value = atomic(
        CONSUME,
        CONSUME_VERSION,
        ports(&[("all", ty)]),
        PortMap::new(),
        Settings::ordered(&["all"]),
    );
    Node::new(id, value, parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_over_concrete_type_is_marked_generic() {
        let node = duplicate(NodeId::new("d"), &PortType::named("string"), None);
        assert!(node.kind().is_atomic());
        assert_eq!(node.value.component(), DUPLICATE);
        assert_eq!(node.value.settings().is_generic, Some(true));
        assert_eq!(
            node.value.settings().generic_type,
            Some(PortType::named("string"))
        );
        let ordering = node.value.settings().argument_ordering.clone().unwrap();
        assert_eq!(ordering, vec!["in", "d1", "d2"]);
    }

    #[test]
    fn join_over_generic_type_is_unmarked() {
        let node = join(NodeId::new("j"), &PortType::named("generic"), None);
        assert_eq!(node.value.special_form, Some(true));
        assert_eq!(node.value.settings().is_generic, None);
        assert_eq!(node.value.settings().generic_type, None);
        assert_eq!(
            node.output_ports().keys().collect::<Vec<_>>(),
            vec!["to"]
        );
    }

    #[test]
    fn consume_has_single_input_and_no_outputs() {
        let node = consume(NodeId::new("c"), &PortType::named("number"), None);
        assert_eq!(node.input_ports().len(), 1);
        assert!(node.output_ports().is_empty());
        assert!(node.parent.is_none());
    }
}
