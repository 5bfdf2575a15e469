//! The `quizzer courses` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use quizzer_providers::config::load_config_from;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let courses = config.list_courses();

    if courses.is_empty() {
        println!(
            "No courses found under {}. Run `quizzer init` and add a subdirectory of PDF notes per course.",
            config.courses_root.display()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Course", "Note files"]);

    for course in &courses {
        let notes_dir = config.notes_dir(course);
        let pdf_count = std::fs::read_dir(&notes_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| {
                        e.path()
                            .extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
                    })
                    .count()
            })
            .unwrap_or(0);

        let material = if pdf_count == 0 {
            "no material".to_string()
        } else {
            format!("{pdf_count} PDF file(s)")
        };
        table.add_row(vec![course.clone(), material]);
    }

    println!("{table}");
    Ok(())
}
