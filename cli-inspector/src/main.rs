use clap::{Parser, ValueEnum};
use mt940_parser::{
    LogSink, Mt940Data, OrderingPolicy, ParserOptions, TagRegistry, Transactions,
    UnknownTagPolicy,
};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "mt940_inspect",
    version,
    about = "Разбирает выписку MT940 и печатает результат в JSON.",
    long_about = None,
)]
struct Args {
    /// Входной файл
    #[arg(long, required_unless_present = "list_tags")]
    input: Option<PathBuf>,

    /// Напечатать таблицу известных тегов и выйти
    #[arg(long)]
    list_tags: bool,

    /// Проверка порядка тегов
    #[arg(long, value_enum, default_value_t = Ordering::Strict)]
    ordering: Ordering,

    /// Что делать с неизвестными тегами
    #[arg(long, value_enum, default_value_t = UnknownTags::Error)]
    unknown_tags: UnknownTags,

    /// Остановиться на первой ошибке
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Ordering {
    Strict,
    Lenient,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum UnknownTags {
    Error,
    Skip,
}

impl Args {
    fn options(&self) -> ParserOptions {
        let ordering = match self.ordering {
            Ordering::Strict => OrderingPolicy::Strict,
            Ordering::Lenient => OrderingPolicy::Lenient,
        };
        let unknown_tags = match self.unknown_tags {
            UnknownTags::Error => UnknownTagPolicy::Error,
            UnknownTags::Skip => UnknownTagPolicy::Skip,
        };
        ParserOptions::default()
            .ordering(ordering)
            .unknown_tags(unknown_tags)
    }
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    }
}

/// Возвращает `false`, если в каком-то теге была ошибка
fn run() -> Result<bool, Box<dyn Error>> {
    let args = Args::parse();
    log::debug!("{args:?}");

    let registry = TagRegistry::standard();
    if args.list_tags {
        list_tags(registry)?;
        return Ok(true);
    }

    let Some(input) = args.input.as_ref() else {
        return Err("--input is required".into());
    };
    let file = File::open(input)
        .map_err(|err| format!("failed to open input file {}: {err}", input.display()))?;
    let data = Mt940Data::parse(BufReader::new(file))?;
    log::info!("{} message(s) in {}", data.messages.len(), input.display());

    let options = args.options();

    let (statements, clean): (Vec<Transactions>, bool) = if args.fail_fast {
        (data.statements(registry, options, LogSink)?, true)
    } else {
        let mut statements = Vec::new();
        let mut clean = true;
        for (index, (statement, errors)) in data
            .statements_collecting(registry, options, LogSink)
            .into_iter()
            .enumerate()
        {
            for err in &errors {
                eprintln!("message {}: {err}", index + 1);
            }
            clean &= errors.is_empty();
            statements.push(statement);
        }
        (statements, clean)
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &statements)?;
    writeln!(handle)?;

    Ok(clean)
}

/// Печатает таблицу тегов, по строке на тег:
/// `:60F: Final opening balance [Statement] 1!a6!n3!a15d`
fn list_tags(registry: &TagRegistry) -> io::Result<()> {
    let mut definitions: Vec<_> = registry.iter().collect();
    definitions.sort_by_key(|d| d.id().to_string());

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for definition in definitions {
        writeln!(
            handle,
            "{definition} [{:?}] {}",
            definition.scope(),
            definition.pattern()
        )?;
    }
    Ok(())
}
