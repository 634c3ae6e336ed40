use std::{
  io::{self, Write},
  sync::Arc,
};

use color_eyre::eyre::{Result, eyre};
use tracing::{error, info};

use crate::{
  cli::{Command, ListSource},
  config::Config,
  items::{
    ItemSource, PaginatedCollection, SourcesTracker,
    sources::{
      SourceServices,
      course_competencies::{CourseCompetenciesSource, CourseCompetency},
      user_badges::{Badge, UserBadgesSource},
    },
  },
  remote::FixtureSite,
  sync::{MemoryOfflinePreferences, PreferencesSync, SyncCoordinator, Warnings},
};

/// Wires the collaborators together and runs one command against them.
pub struct App<W: Write = io::Stdout> {
  config: Config,
  site: Arc<FixtureSite>,
  services: SourceServices,
  sources: SourcesTracker,
  preferences: PreferencesSync,
  out: W,
}

impl App {
  pub fn new(config: Config, site: FixtureSite) -> Self {
    App::with_output(config, site, io::stdout())
  }
}

impl<W: Write> App<W> {
  pub fn with_output(config: Config, site: FixtureSite, out: W) -> Self {
    let site = Arc::new(site);
    let store = Arc::new(MemoryOfflinePreferences::with_entries(site.offline_seed()));
    let coordinator = Arc::new(SyncCoordinator::new(config.sync_interval()));
    let preferences = PreferencesSync::new(coordinator, site.clone(), store);
    let services = SourceServices { remote: site.clone(), cache: site.clone() };
    App { config, site, services, sources: SourcesTracker::new(), preferences, out }
  }

  pub async fn run(&mut self, command: Command) -> Result<()> {
    match command {
      Command::List { source: ListSource::Badges { course, user }, pages } => {
        let page_length = self.config.page_length();
        let services = self.services.clone();
        let source = self.sources.get_or_create(&UserBadgesSource::identity_for(course, user), || {
          UserBadgesSource::new(course, user, page_length, services)
        });
        self.list(source, pages, |badge: &Badge| badge.name.clone()).await
      },
      Command::List { source: ListSource::Competencies { course, user }, pages } => {
        let services = self.services.clone();
        let source = self.sources.get_or_create(&CourseCompetenciesSource::identity_for(course, user), || {
          CourseCompetenciesSource::new(course, user, services)
        });
        self.list(source.clone(), pages, |item: &CourseCompetency| item.competency.shortname.clone()).await?;
        if let Some(user) = source.context().and_then(|context| context.user.clone()) {
          writeln!(self.out, "user: {}", user.fullname)?;
        }
        Ok(())
      },
      Command::Sync { site, all, force } => {
        let sites = match (all, site) {
          (true, _) => self.site.site_ids(),
          (false, Some(site)) => vec![site],
          (false, None) => vec![self.config.default_site.clone()],
        };
        self.sync(&sites, force).await
      },
    }
  }

  async fn list<S, F>(&mut self, source: Arc<S>, pages: Option<usize>, label: F) -> Result<()>
  where
    S: ItemSource,
    F: Fn(&S::Item) -> String,
  {
    let collection = PaginatedCollection::new(source);
    let mut loaded_pages = 0;
    loop {
      collection.load().await?;
      loaded_pages += 1;
      if collection.is_completed() || pages.is_some_and(|pages| loaded_pages >= pages) {
        break;
      }
    }
    info!("Loaded {} item(s) of {} in {} page(s)", collection.len(), collection.source().identity(), loaded_pages);

    for item in collection.items() {
      writeln!(self.out, "{}\t{}", collection.item_path(&item), label(&item))?;
    }
    if !collection.is_completed() {
      writeln!(self.out, "(more items available)")?;
    }
    Ok(())
  }

  async fn sync(&mut self, sites: &[String], force: bool) -> Result<()> {
    let results = self.preferences.sync_all_preferences(sites, force).await;
    let mut failed = 0;
    for (site, result) in results {
      match result {
        Ok(Some(warnings)) => self.report_warnings(&site, &warnings)?,
        Ok(None) => writeln!(self.out, "{}: synced recently, skipped", site)?,
        Err(err) => {
          error!("Preferences sync for {} failed: {}", site, err);
          writeln!(self.out, "{}: sync failed: {}", site, err)?;
          failed += 1;
        },
      }
    }
    if failed > 0 {
      return Err(eyre!("{} site(s) failed to sync", failed));
    }
    Ok(())
  }

  fn report_warnings(&mut self, site: &str, warnings: &Warnings) -> Result<()> {
    if warnings.is_empty() {
      writeln!(self.out, "{}: preferences synced", site)?;
    } else {
      writeln!(self.out, "{}: preferences synced with {} warning(s)", site, warnings.len())?;
      for warning in warnings.iter() {
        writeln!(self.out, "  {}", warning)?;
      }
    }
    Ok(())
  }
}
