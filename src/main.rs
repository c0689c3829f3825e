use flow_diagrammer::persistence::FileStore;
use flow_diagrammer::{EditorConfig, FlowData, PersistenceError, Project, ProjectRepository};
use std::path::Path;
use std::process::ExitCode;

fn print_level(flow: &FlowData, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} nodes, {} edges",
        flow.nodes.len(),
        flow.edges.len()
    );
    for process in flow.processes.values() {
        println!("{indent}- {} ({})", process.name, process.id);
        print_level(&process.flow, depth + 1);
    }
}

/// Projects from a storage directory, or from a single export file.
fn load_projects(path: &Path) -> Result<Vec<Project>, PersistenceError> {
    if path.is_dir() {
        let repository = ProjectRepository::new(FileStore::new(path), EditorConfig::default());
        Ok(repository.load())
    } else {
        Ok(ProjectRepository::<FileStore>::load_from_path(path)?.projects)
    }
}

fn main() -> ExitCode {
    // Set up logging for development
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: flow_diagrammer <storage-dir | export.json>");
        return ExitCode::FAILURE;
    };

    match load_projects(Path::new(&path)) {
        Ok(projects) => {
            for project in &projects {
                println!("{} ({})", project.name, project.id);
                print_level(&project.flow, 1);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to open {path}: {e}");
            ExitCode::FAILURE
        }
    }
}
