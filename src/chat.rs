//! Interactive question loop.
//!
//! Reads one question per line from stdin, runs it through the query
//! service, and prints the answer. `exit` (or end of input) terminates the
//! loop. Per-question failures are printed and the loop continues.

use std::io::{BufRead, Write};

use crate::config::Config;
use crate::service::QueryService;

pub async fn run_chat(config: &Config) -> anyhow::Result<()> {
    let service = QueryService::open(config).await?;

    println!("--- Casebook manual assistant ---");
    println!("Ask a question about the indexed manuals. Type 'exit' to quit.");
    println!("{}", "-".repeat(50));

    let stdin = std::io::stdin();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            println!("Assistant: Goodbye!");
            break;
        }
        if question.is_empty() {
            continue;
        }

        println!("\nAssistant: thinking...");
        match service.answer(question).await {
            Ok(answer) => println!("\nAssistant:\n{}", answer),
            Err(e) => println!("\nAssistant: request failed: {}", e),
        }
        println!("{}", "-".repeat(50));
    }

    Ok(())
}
