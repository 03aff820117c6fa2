//! The `quizforge init` command.

use std::path::Path;

use anyhow::Result;

use quizforge_store::config::CONFIG_FILE_NAME;

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all("quiz-samples")?;
    for (name, content) in [
        ("questions.json", SAMPLE_JSON),
        ("questions.csv", SAMPLE_CSV),
        ("questions.txt", SAMPLE_TEXT),
    ] {
        let path = Path::new("quiz-samples").join(name);
        if path.exists() {
            println!("{} already exists, skipping.", path.display());
        } else {
            std::fs::write(&path, content)?;
            println!("Created {}", path.display());
        }
    }

    println!("\nNext steps:");
    println!("  1. Set `user` in {CONFIG_FILE_NAME}");
    println!("  2. Run: quizforge create-test --title \"My first test\"");
    println!("  3. Run: quizforge import --test <TEST_ID> --file quiz-samples/questions.csv");
    println!("  4. Run: quizforge take --test <TEST_ID>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

# The user id every command acts as.
user = "me"
output_dir = "./quizforge-output"

[backend]
type = "file"
path = "quizforge-data.json"

# Hosted REST backend:
# [backend]
# type = "rest"
# base_url = "https://example.supabase.co"
# api_key = "${QUIZFORGE_API_KEY}"
"#;

const SAMPLE_JSON: &str = r#"[
  {
    "question": "What is 2 + 2?",
    "answers": ["3", "4", "5", "22"],
    "correctAnswer": 1,
    "group": "Math"
  },
  {
    "question": "Which planet is closest to the sun?",
    "answers": ["Venus", "Earth", "Mercury", "Mars"],
    "correctAnswer": 2,
    "group": "Science"
  }
]
"#;

const SAMPLE_CSV: &str = "question,a,b,c,d,correct,group
What is 3 x 3?,6,9,12,33,B,Math
What is the chemical symbol for water?,H2O,CO2,O2,NaCl,A,Science
";

const SAMPLE_TEXT: &str = "What is 10 / 2?
A) 2
B) 5
C) 8
D) 20
Correct: 1
Group: Math

Which gas do plants absorb?
A) Oxygen
B) Nitrogen
C) Carbon dioxide
D) Helium
Correct: 2
Group: Science
";
