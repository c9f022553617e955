//! Replay a drag against a board stored as YAML.
//!
//! Usage:
//!   cargo run -p swissarmyhammer-kanban-dnd --example replay_board -- board.yaml ITEM CONTAINER [config.yaml]
//!
//! Picks up ITEM, drops it at the end of CONTAINER, and prints the resulting order.
//! Set `RUST_LOG=swissarmyhammer_kanban_dnd=trace` to follow every step.

use std::sync::Arc;
use swissarmyhammer_kanban_dnd::{
    BoardSnapshot, DragStart, DropOutcome, InMemoryGateway, OrderingConfig, OrderingEngine,
    OverTarget,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [board_path, item, container, rest @ ..] = args.as_slice() else {
        eprintln!("usage: replay_board BOARD.yaml ITEM CONTAINER [CONFIG.yaml]");
        std::process::exit(2);
    };

    let text = std::fs::read_to_string(board_path).expect("cannot read board file");
    let snapshot: BoardSnapshot = serde_yaml_ng::from_str(&text).expect("invalid board YAML");
    let config = match rest.first() {
        Some(path) => OrderingConfig::load(path).expect("invalid config"),
        None => OrderingConfig::default(),
    };

    let board_id = snapshot.board_id.clone();
    let gateway = Arc::new(InMemoryGateway::new(snapshot));
    let mut engine = OrderingEngine::load(gateway, &board_id, config)
        .await
        .expect("cannot load board");

    if !engine.on_drag_start(DragStart::Item(item.as_str().into())) {
        eprintln!("No item '{}' on board '{}'", item, board_id);
        std::process::exit(1);
    }
    let over = OverTarget::ContainerSurface(container.as_str().into());
    engine.on_drag_over(Some(&over));

    match engine.on_drag_end(Some(&over)) {
        Ok(DropOutcome::Applied(pending)) => {
            let report = engine.settle(pending).await;
            eprintln!("Drop resolved: {:?}", report.status);
        }
        Ok(outcome) => eprintln!("Nothing moved: {:?}", outcome),
        Err(e) => {
            eprintln!("Drop failed: {}", e);
            std::process::exit(1);
        }
    }

    for list in engine.working_set().sorted_containers() {
        println!("{} (position {})", list.id, list.position);
        for card in engine.items_in(&list.id) {
            match card.order_key {
                Some(key) => println!("  {} [{}]", card.id, key),
                None => println!("  {} [unkeyed]", card.id),
            }
        }
    }
}
