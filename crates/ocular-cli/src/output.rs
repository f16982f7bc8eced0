//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use ocular_core::analysis::{AnalysisResult, InvariantViolation};

/// Colour a confidence score by band.
fn confidence_colored(score: f64) -> ColoredString {
    let text = format!("{:.0}%", score);
    if score >= 80.0 {
        text.green()
    } else if score >= 50.0 {
        text.yellow()
    } else {
        text.red()
    }
}

fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

/// Print a screening report.
pub fn print_report(result: &AnalysisResult, violations: &[InvariantViolation]) {
    println!();
    if result.is_healthy {
        println!("{}", "No abnormalities detected".green().bold());
    } else {
        println!(
            "{} {}",
            "Suspected:".bold(),
            result.primary_diagnosis.yellow().bold()
        );
    }
    println!(
        "{}: {}",
        "Confidence".bold(),
        confidence_colored(result.confidence_score)
    );
    println!();
    println!("{}", result.summary);

    if !result.symptoms.is_empty() {
        section("Detected symptoms");
        for (i, symptom) in result.symptoms.iter().enumerate() {
            let b = &symptom.bounding_box;
            println!(
                "  {}. {} {}",
                i + 1,
                symptom.name.cyan(),
                format!("({})", symptom.anatomical_layer).dimmed()
            );
            println!("     {}", symptom.description);
            println!(
                "     {}",
                format!(
                    "box x={:.1}% y={:.1}% w={:.1}% h={:.1}%",
                    b.x, b.y, b.width, b.height
                )
                .dimmed()
            );
        }
    }

    if !result.differential_diagnoses.is_empty() {
        section("Differential diagnoses");
        for diagnosis in &result.differential_diagnoses {
            println!("  {} {}", "•".dimmed(), diagnosis.name.bold());
            println!("    {}", diagnosis.reasoning);
        }
    }

    if !result.possible_symptoms.is_empty() {
        section("Associated symptoms");
        println!("  {}", result.possible_symptoms.join(", "));
    }

    if !result.is_healthy {
        section("Treatment information");
        println!("  {}", result.treatment);
    }

    section("Next steps");
    println!("  {}", result.next_steps);

    if !violations.is_empty() {
        println!();
        for violation in violations {
            println!("{} {}", "!".yellow(), violation.to_string().yellow());
        }
    }

    println!();
    println!(
        "{}",
        "Informational only. Not a substitute for professional medical advice.".dimmed()
    );
}
