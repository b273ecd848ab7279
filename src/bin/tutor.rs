use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use lesson_forge::clients::{ClientType, FlexibleClient, GeminiClient};
use lesson_forge::config::{self, KeyFromEnv};
use lesson_forge::domain::{Answer, AnswerValue, LessonContent, LessonData, Question, QuestionType};
use lesson_forge::store::{FileStore, ProgressStore};
use lesson_forge::{badges, Level, Skill, Tutor};

#[derive(Parser)]
#[command(author, version, about = "English practice with AI-generated lessons", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    GEMINI_API_KEY          API key (takes precedence over a saved key)
    GEMINI_MODEL            Model id override, e.g. gemini-1.5-pro
    GEMINI_BASE_URL         API base URL override
    LESSON_FORGE_DATA_DIR   Where progress and settings are stored [default: .lesson-forge]
    RUST_LOG                Log filter [default: warn,lesson_forge=info]

EXAMPLES:
    tutor set-key AIza...                     # Save an API key
    tutor section --skill grammar             # Show a generated section at your level
    tutor practice --skill reading            # Answer questions and earn XP
    tutor evaluate -q \"Describe your town\" -a \"It is small.\" --mode writing
    tutor progress                            # Levels, XP, streak and badges
    tutor --client mock practice --skill grammar   # Offline, built-in lessons")]
struct Args {
    /// Model backend: gemini, or mock for offline use with built-in lessons
    #[arg(long, global = true, default_value = "gemini", value_parser = ClientType::from_str)]
    client: ClientType,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and print a lesson section
    Section {
        #[arg(short, long)]
        skill: Skill,
        /// Defaults to the learner's current level for the skill
        #[arg(short, long)]
        level: Option<Level>,
        /// Print the section as JSON
        #[arg(long)]
        json: bool,
    },
    /// Work through a generated section interactively
    Practice {
        #[arg(short, long)]
        skill: Skill,
        #[arg(short, long)]
        level: Option<Level>,
    },
    /// Grade one open answer
    Evaluate {
        #[arg(short, long)]
        question: String,
        #[arg(short, long)]
        answer: String,
        /// Passage or other grounding context
        #[arg(short, long)]
        context: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Mode::General)]
        mode: Mode,
        /// Word target for writing mode
        #[arg(long)]
        min_words: Option<u32>,
    },
    /// Show levels, XP, streak and badges
    Progress,
    /// Save a Gemini API key
    SetKey { key: String },
    /// Save a default Gemini model id
    SetModel { model: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    General,
    Speaking,
    Writing,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,lesson_forge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let data_dir = config::data_dir();
    let progress_store = ProgressStore::new(FileStore::new(&data_dir));

    match &args.command {
        Command::SetKey { key } => {
            if key.trim().is_empty() {
                bail!("API key must not be empty");
            }
            progress_store
                .save_api_key(key)
                .await
                .with_context(|| format!("saving key under {}", data_dir.display()))?;
            println!("API key saved.");
            if GeminiClient::prompt_save_to_env() {
                GeminiClient::save_to_env_file(key).context("writing .env")?;
                println!("Added {} to .env", GeminiClient::KEY_NAME);
            }
            return Ok(());
        }
        Command::SetModel { model } => {
            progress_store.save_model(model).await?;
            println!("Model set to {}.", model.trim());
            return Ok(());
        }
        _ => {}
    }

    let settings = progress_store.load_settings().await?;
    let client = FlexibleClient::from_type(args.client.clone(), &settings);
    let mut tutor = Tutor::load(client, FileStore::new(&data_dir)).await?;

    match args.command {
        Command::Section { skill, level, json } => {
            let level = level.unwrap_or(tutor.user().skill(skill).level);
            let section = tutor
                .open_section(skill, level)
                .await
                .context("section request was superseded")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&section)?);
            } else {
                println!("{}\n{}\n", section.title, section.description);
                for lesson in &section.lessons {
                    println!("- {} ({} questions)", lesson.title, lesson.questions.len());
                }
            }
        }
        Command::Practice { skill, level } => practice(&mut tutor, skill, level).await?,
        Command::Evaluate {
            question,
            answer,
            context,
            mode,
            min_words,
        } => {
            let evaluator = tutor.evaluator();
            let feedback = match mode {
                Mode::Speaking => evaluator.evaluate_speaking(&question, &answer).await,
                Mode::Writing => evaluator.evaluate_writing(&question, &answer, min_words).await,
                Mode::General => evaluator.evaluate(&question, &answer, context.as_deref()).await,
            };
            println!(
                "{} (score {}/100)\n{}",
                if feedback.correct { "Correct" } else { "Needs work" },
                feedback.score,
                feedback.feedback
            );
        }
        Command::Progress => print_progress(&tutor),
        Command::SetKey { .. } | Command::SetModel { .. } => {}
    }

    Ok(())
}

fn print_progress<C, S>(tutor: &Tutor<C, S>)
where
    C: lesson_forge::LowLevelClient + Clone,
    S: lesson_forge::store::KeyValueStore,
{
    let user = tutor.user();
    println!("Total XP: {}   Streak: {} day(s)", user.total_xp, user.streak);
    for skill in Skill::ALL {
        let p = user.skill(skill);
        println!(
            "  {:<11} {:<13} {:>5} XP  {:>3} activities",
            skill.display_name(),
            p.level.display_name(),
            p.xp,
            p.completed.len()
        );
    }
    if user.badges.is_empty() {
        println!("No badges yet.");
    } else {
        println!("Badges:");
        for id in &user.badges {
            match badges::find_badge(id) {
                Some(b) => println!("  {} {} - {}", b.icon, b.name, b.description),
                None => println!("  {}", id),
            }
        }
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("input closed");
    }
    Ok(line.trim().to_string())
}

fn print_material(lesson: &LessonData) {
    println!("\n=== {} ===", lesson.title);
    match &lesson.content {
        LessonContent::Listening { audio_text } => println!("(Transcript) {}", audio_text),
        LessonContent::Reading { text } => println!("{}", text),
        LessonContent::Writing {
            prompt,
            instructions,
            min_words,
        } => {
            println!("{}\nAt least {} words.", prompt, min_words);
            for line in instructions {
                println!("  * {}", line);
            }
        }
        LessonContent::Speaking {
            instructions,
            prompts,
        } => {
            println!("{}", instructions);
            for p in prompts {
                println!("  * {}", p);
            }
        }
        LessonContent::Grammar {
            explanation,
            examples,
        } => {
            println!("{}", explanation);
            for e in examples {
                println!("  e.g. {}", e);
            }
        }
        LessonContent::Vocabulary { words } => {
            for w in words {
                println!("  {}: {} ({})", w.word, w.definition, w.example);
            }
        }
    }
}

/// Turn typed input into the answer shape the question expects.
fn parse_answer(question: &Question, input: &str) -> AnswerValue {
    match question.kind {
        QuestionType::Mcq => match input.parse::<usize>() {
            Ok(n) if n >= 1 => AnswerValue::from(n - 1),
            _ => AnswerValue::from(input),
        },
        QuestionType::TrueFalse => match input.to_lowercase().as_str() {
            "t" | "y" | "yes" => AnswerValue::Bool(true),
            "f" | "n" | "no" => AnswerValue::Bool(false),
            other => AnswerValue::from(other),
        },
        _ => AnswerValue::from(input),
    }
}

async fn practice<C, S>(tutor: &mut Tutor<C, S>, skill: Skill, level: Option<Level>) -> Result<()>
where
    C: lesson_forge::LowLevelClient + Clone,
    S: lesson_forge::store::KeyValueStore,
{
    let level = level.unwrap_or(tutor.user().skill(skill).level);
    let unlocked = tutor
        .levels(skill)
        .into_iter()
        .any(|(l, open)| l == level && open);
    if !unlocked {
        bail!("{} {} is locked; earn more {} XP first", skill.display_name(), level.display_name(), skill);
    }

    let section = tutor
        .open_section(skill, level)
        .await
        .context("section request was superseded")?;
    println!("{}\n{}", section.title, section.description);

    for lesson in &section.lessons {
        print_material(lesson);
        let mut answers: Vec<Answer> = Vec::new();
        for question in &lesson.questions {
            println!("\n{}", question.question);
            if let Some(options) = &question.options {
                for (i, option) in options.iter().enumerate() {
                    println!("  {}. {}", i + 1, option);
                }
            }
            let input = loop {
                let line = read_line("> ")?;
                if !line.trim().is_empty() {
                    break line;
                }
                println!("Type an answer, or q to quit.");
            };
            if input.eq_ignore_ascii_case("q") {
                return Ok(());
            }
            let submission = tutor
                .submit(skill, lesson, question, parse_answer(question, &input))
                .await?;
            if let Some(feedback) = &submission.answer.feedback {
                println!("{}", feedback);
            }
            println!("+{} XP", submission.answer.points.unwrap_or(0));
            if let Some(level) = submission.outcome.leveled_up {
                println!("Level up! {} is now {}.", skill.display_name(), level.display_name());
            }
            for id in &submission.outcome.new_badges {
                if let Some(b) = badges::find_badge(id) {
                    println!("Badge earned: {} {}", b.icon, b.name);
                }
            }
            answers.push(submission.answer);
        }
        let record = tutor.finish_lesson(lesson, &answers).await?;
        println!("Lesson score: {}%", record.score);
    }
    Ok(())
}
