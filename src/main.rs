use nestedset::{
    Annotate, ExternalNode, HierarchyView, MemoryStore, NewNode, Node, NodeId, TreeConfig, TreeManager,
};
use std::error::Error;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Logs to stderr, filtered by `RUST_LOG` (info when unset).
fn init_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn sample_forest() -> Vec<ExternalNode> {
    vec![
        ExternalNode::new(1, None).with("name", "x"),
        ExternalNode::new(2, Some(1)).with("name", "y"),
        ExternalNode::new(3, Some(1)).with("name", "z"),
        ExternalNode::new(4, None).with("name", "w"),
    ]
}

fn print_tree(tree: &TreeManager<MemoryStore>, node: &Node) -> Result<(), Box<dyn Error>> {
    let indent = "  ".repeat(node.depth() as usize);
    let children = node.children_count.unwrap_or(0);
    println!("{}{} ({} below)", indent, node, children);
    for child in tree.children_of_annotated(node.id(), &[], true, Annotate::Recursive)? {
        print_tree(tree, &child)?;
    }
    Ok(())
}

/// Collects `parent`'s subtree, parents first.
fn export(view: &HierarchyView<MemoryStore>, parent: NodeId, out: &mut Vec<ExternalNode>) -> Result<(), Box<dyn Error>> {
    for child in view.children_of::<ExternalNode>(Some(parent), &[], Annotate::None)? {
        let id = child.id;
        out.push(child);
        if let Some(id) = id {
            export(view, NodeId::from_u64(id), out)?;
        }
    }
    Ok(())
}

fn read_forest(path: &str) -> Result<Vec<ExternalNode>, Box<dyn Error>> {
    let source = fs::read_to_string(path)?;
    if path.ends_with(".edn") {
        Ok(ExternalNode::parse_forest(&source)?)
    } else {
        Ok(serde_json::from_str(&source)?)
    }
}

/// Usage: `nestedset [forest.json|forest.edn] [config.edn]`
///
/// Imports the forest under a fresh root, prints the resulting tree and
/// writes it back out as an EDN forest keyed by internal ids.
fn main() -> Result<(), Box<dyn Error>> {
    init_subscriber();
    let mut args = std::env::args().skip(1);

    let forest: Vec<ExternalNode> = match args.next() {
        Some(path) => read_forest(&path)?,
        None => sample_forest(),
    };
    let config = match args.next() {
        Some(path) => TreeConfig::from_edn_str(&fs::read_to_string(path)?)?,
        None => TreeConfig::default(),
    };

    let tree = TreeManager::new(MemoryStore::new()).with_config(config);
    let root = tree.insert_root(NewNode::new().with("name", "import"))?;
    let report = tree.import_forest(&forest, root.id())?;
    let stats = tree.verify()?;

    let mut root = tree.require_root()?;
    tree.annotate_child_counts(std::slice::from_mut(&mut root), false)?;
    print_tree(&tree, &root)?;
    println!(
        "{} imported, {} dropped, {} nodes, depth {}",
        report.inserted,
        report.dropped.len(),
        stats.nodes,
        stats.max_depth
    );
    let view = HierarchyView::new(&tree);
    let mut exported = vec![view.by_id::<ExternalNode>(root.id())?];
    export(&view, root.id(), &mut exported)?;
    println!("{}", ExternalNode::emit_forest(&exported)?);
    Ok(())
}
