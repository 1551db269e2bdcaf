//! Session and folder management persisted through `sessions.json`

use std::cell::RefCell;
use std::rc::Rc;

use tempfile::TempDir;
use zashterminal_core::config::ConfigPaths;
use zashterminal_core::models::{SessionFolder, SessionItem};
use zashterminal_core::sessions::{SessionOperations, SessionStorage, SessionTree, TreeNode};
use zashterminal_core::signals::{AppEvent, SignalBus};

fn operations(dir: &TempDir) -> SessionOperations {
    let paths = ConfigPaths::with_root(dir.path());
    SessionOperations::load(SessionStorage::new(paths.sessions_file())).unwrap()
}

#[test]
fn folders_and_sessions_survive_reload() {
    let dir = TempDir::new().unwrap();
    let mut ops = operations(&dir);

    assert!(ops.add_folder(SessionFolder::new("Work", "")).success);
    assert!(ops.add_folder(SessionFolder::new("Db", "/Work")).success);

    let mut web = SessionItem::ssh("web", "web.example.com", "deploy", 22);
    web.set_folder_path("/Work");
    assert!(ops.add_session(web.clone()).success);
    assert!(ops.add_session(SessionItem::local("scratch")).success);

    let duplicate = ops.add_session(web.clone());
    assert!(!duplicate.success);
    assert!(duplicate.message.contains("already exists"));

    let mut orphan = SessionItem::ssh("orphan", "h", "u", 22);
    orphan.set_folder_path("/Nowhere");
    assert!(!ops.add_session(orphan).success);

    let reloaded = operations(&dir);
    assert_eq!(reloaded.sessions().len(), 2);
    assert_eq!(reloaded.folders().len(), 2);
    let (found, _) = reloaded.find_session_by_name_and_path("web", "/Work").unwrap();
    assert_eq!(found.host, "web.example.com");
    assert!(reloaded.find_folder_by_path("/Work/Db").is_some());
}

#[test]
fn moving_folders_rewrites_descendants() {
    let dir = TempDir::new().unwrap();
    let mut ops = operations(&dir);
    ops.add_folder(SessionFolder::new("Work", ""));
    ops.add_folder(SessionFolder::new("Db", "/Work"));
    ops.add_folder(SessionFolder::new("Archive", ""));
    let mut db = SessionItem::ssh("primary", "db1", "root", 22);
    db.set_folder_path("/Work/Db");
    ops.add_session(db);

    let (work, _) = ops.find_folder_by_path("/Work").unwrap();
    let work = work.clone();
    assert!(ops.move_folder(&work, "/Archive").success);

    let mut ops = operations(&dir);
    assert!(ops.find_folder_by_path("/Archive/Work/Db").is_some());
    assert!(ops
        .find_session_by_name_and_path("primary", "/Archive/Work/Db")
        .is_some());

    let archive = ops.find_folder_by_path("/Archive").unwrap().0.clone();
    assert!(!ops.move_folder(&archive, "/Archive/Work").success);
    assert!(!ops.remove_folder(&archive, false).success);
    assert!(ops.remove_folder(&archive, true).success);
    assert!(ops.sessions().is_empty());
    assert!(ops.folders().is_empty());
}

#[test]
fn clipboard_paste_and_signals() {
    let dir = TempDir::new().unwrap();
    let bus = Rc::new(SignalBus::new());
    let created = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&created);
    bus.connect(move |event| {
        if let AppEvent::SessionCreated(session) = event {
            sink.borrow_mut().push(session.name.clone());
        }
    });

    let mut ops = operations(&dir).with_signals(Rc::clone(&bus));
    ops.add_folder(SessionFolder::new("Lab", ""));
    ops.add_session(SessionItem::ssh("router", "10.0.0.1", "admin", 22));

    let mut tree = SessionTree::build(ops.sessions().to_vec(), ops.folders().to_vec(), Vec::new());
    let router = tree
        .root_nodes()
        .into_iter()
        .find(|n| matches!(n, TreeNode::Session(_)))
        .unwrap();
    assert!(tree.copy_node(&router));
    let (entry, is_cut) = tree.take_clipboard().unwrap();
    assert!(!is_cut);

    let pasted = ops.paste_item(&entry, "/Lab", false);
    assert!(pasted.success, "{}", pasted.message);
    assert!(ops.find_session_by_name_and_path("router", "/Lab").is_some());
    assert!(ops.find_session_by_name_and_path("router", "").is_some());

    let pasted_again = ops.paste_item(&entry, "/Lab", false);
    assert!(pasted_again.success);
    assert!(ops.find_session_by_name_and_path("router (1)", "/Lab").is_some());
    assert_eq!(*created.borrow(), vec!["router", "router", "router (1)"]);

    tree.refresh(ops.sessions().to_vec(), ops.folders().to_vec(), Vec::new());
    tree.set_expanded("/Lab", true);
    let rows: Vec<(usize, String)> = tree
        .visible_rows()
        .into_iter()
        .map(|(depth, node)| (depth, node.name().to_string()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (0, "Lab".to_string()),
            (1, "router".to_string()),
            (1, "router (1)".to_string()),
            (0, "router".to_string()),
        ]
    );

    tree.set_filter_text("(1)");
    let rows: Vec<String> = tree
        .visible_rows()
        .into_iter()
        .map(|(_, node)| node.name().to_string())
        .collect();
    assert_eq!(rows, vec!["Lab", "router (1)"]);
}
