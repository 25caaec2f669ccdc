//! Integration tests: stats engine over a real SQLite results database
//!
//! Each test builds a fresh database in a temp dir, applies the `sql/`
//! migrations and seeds a small 2021-2023 dataset:
//! - Red Bull (9) scores in 2021 and 2023 only
//! - 2023 round 1 has a sprint and a main race session
//! - Mercedes (131) has one result on a session whose race does not exist
//! - George Russell (63) has no precomposed standings name

#[cfg(test)]
mod engine_sqlite_tests {
    use racestats::stats_core::{
        BackendKind, CareerTotals, EntityKind, ProgressionPoint, SeasonPoints, SeasonSummary,
        SqliteRecordStore, StatsEngine, StatsError, TraceRow,
    };
    use rusqlite::Connection;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    const SCHEMA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/sql");
    const SEASON_2023: i64 = 74;

    fn seed(db_path: &Path) {
        let conn = Connection::open(db_path).unwrap();
        conn.execute_batch(
            "INSERT INTO seasons (id, year) VALUES (72, 2021), (73, 2022), (74, 2023);
             INSERT INTO races (id, season_id, round, name) VALUES
                 (1001, 72, 1, 'Bahrain Grand Prix'),
                 (1101, 73, 1, 'Bahrain Grand Prix'),
                 (1201, 74, 1, 'Bahrain Grand Prix'),
                 (1202, 74, 2, 'Saudi Arabian Grand Prix'),
                 (1203, 74, 3, 'Australian Grand Prix');
             INSERT INTO sessions (id, race_id) VALUES
                 (5001, 1001), (5101, 1101),
                 (5201, 1201), (5202, 1201), (5211, 1202), (5221, 1203),
                 (5999, 9999);
             INSERT INTO drivers (id, forename, surname) VALUES
                 (1, 'Max', 'Verstappen'), (11, 'Sergio', 'Perez'),
                 (16, 'Charles', 'Leclerc'), (63, 'George', 'Russell');
             INSERT INTO constructors (id, name, is_active) VALUES
                 (9, 'Red Bull', 1), (6, 'Ferrari', 1), (131, 'Mercedes', 1), (50, 'Minardi', 0);
             INSERT INTO driver_standings_materialized (driver_id, season_year, driver_full_name, position)
                 VALUES (1, 2023, 'Max Verstappen', 1), (11, 2023, 'Sergio Perez', 2),
                        (16, 2023, 'Charles Leclerc', 3), (63, 2023, NULL, 5);
             INSERT INTO race_results (driver_id, constructor_id, session_id, position, points) VALUES
                 (1, 9, 5001, 1, 25),
                 (1, 9, 5202, 4, 10),
                 (11, 9, 5202, 12, 0),
                 (11, 9, 5221, 2, '15'),
                 (16, 6, 5201, 1, 8),
                 (16, 6, 5202, 1, 25),
                 (16, 6, 5211, 3, 15.0),
                 (16, 6, 5221, NULL, NULL),
                 (63, 131, 5211, 1, 25),
                 (63, 131, 5999, 1, 25);",
        )
        .unwrap();
    }

    fn setup_db() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("racestats.db");

        let store = SqliteRecordStore::open(&db_path).unwrap();
        store.run_schema_migrations(SCHEMA_DIR).unwrap();
        seed(&db_path);

        (dir, db_path)
    }

    fn engine(db_path: &Path, backend: BackendKind) -> StatsEngine<SqliteRecordStore> {
        StatsEngine::new(SqliteRecordStore::open(db_path).unwrap())
            .with_backend(backend)
            .with_fan_out(3)
    }

    #[tokio::test]
    async fn test_constructor_progression_end_to_end() {
        let (_dir, db_path) = setup_db();

        let expected = vec![
            ProgressionPoint {
                round: 1,
                race_name: "Bahrain Grand Prix".to_string(),
                race_points: 10.0,
                cumulative_points: 10.0,
            },
            ProgressionPoint {
                round: 3,
                race_name: "Australian Grand Prix".to_string(),
                race_points: 15.0,
                cumulative_points: 25.0,
            },
        ];

        for backend in [BackendKind::InMemory, BackendKind::WindowedSql] {
            let progression = engine(&db_path, backend)
                .progression(EntityKind::Constructor, 9, SEASON_2023)
                .await
                .unwrap();
            assert_eq!(progression, expected, "backend {}", backend.as_str());
        }
    }

    #[tokio::test]
    async fn test_backends_agree_on_all_driver_progressions() {
        let (_dir, db_path) = setup_db();

        let in_memory = engine(&db_path, BackendKind::InMemory)
            .all_progressions(EntityKind::Driver, SEASON_2023)
            .await
            .unwrap();
        let windowed = engine(&db_path, BackendKind::WindowedSql)
            .all_progressions(EntityKind::Driver, SEASON_2023)
            .await
            .unwrap();

        assert_eq!(in_memory, windowed);

        // standings order, with the name-parts fallback for 63
        let ids: Vec<i64> = in_memory.iter().map(|p| p.entity_id).collect();
        assert_eq!(ids, vec![1, 11, 16, 63]);
        assert_eq!(in_memory[3].entity_name, "George Russell");

        // sprint and main race share round 1; the NULL round 3 result still counts
        let leclerc = &in_memory[2].progression;
        let cumulative: Vec<f64> = leclerc.iter().map(|p| p.cumulative_points).collect();
        assert_eq!(cumulative, vec![33.0, 48.0, 48.0]);

        // the dangling session contributes nothing
        assert_eq!(in_memory[3].progression.len(), 1);
        assert_eq!(in_memory[3].progression[0].cumulative_points, 25.0);
    }

    /// Malformed and overflowing point cells read as 0 on both backends
    #[tokio::test]
    async fn test_backends_agree_on_loose_point_cells() {
        let (_dir, db_path) = setup_db();
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "INSERT INTO seasons (id, year) VALUES (75, 2024);
             INSERT INTO races (id, season_id, round, name) VALUES
                 (1301, 75, 1, 'Bahrain Grand Prix'),
                 (1302, 75, 2, 'Saudi Arabian Grand Prix');
             INSERT INTO sessions (id, race_id) VALUES (5301, 1301), (5311, 1302);
             INSERT INTO race_results (driver_id, constructor_id, session_id, position, points) VALUES
                 (1, 9, 5301, 3, '12pts'),
                 (11, 9, 5301, 5, 3),
                 (1, 9, 5311, 7, '1e999'),
                 (11, 9, 5311, 8, ' 4.5 '),
                 (1, 9, 5311, 9, 'inf');",
        )
        .unwrap();

        let expected = vec![
            ProgressionPoint {
                round: 1,
                race_name: "Bahrain Grand Prix".to_string(),
                race_points: 3.0,
                cumulative_points: 3.0,
            },
            ProgressionPoint {
                round: 2,
                race_name: "Saudi Arabian Grand Prix".to_string(),
                race_points: 4.5,
                cumulative_points: 7.5,
            },
        ];

        for backend in [BackendKind::InMemory, BackendKind::WindowedSql] {
            let progression = engine(&db_path, backend)
                .progression(EntityKind::Constructor, 9, 75)
                .await
                .unwrap();
            assert_eq!(progression, expected, "backend {}", backend.as_str());
        }
    }

    #[tokio::test]
    async fn test_constructor_roster_is_active_by_name() {
        let (_dir, db_path) = setup_db();

        for backend in [BackendKind::InMemory, BackendKind::WindowedSql] {
            let all = engine(&db_path, backend)
                .all_progressions(EntityKind::Constructor, SEASON_2023)
                .await
                .unwrap();

            let names: Vec<&str> = all.iter().map(|p| p.entity_name.as_str()).collect();
            assert_eq!(names, vec!["Ferrari", "Mercedes", "Red Bull"]);
            assert_eq!(all[0].progression.last().unwrap().cumulative_points, 48.0);
        }
    }

    #[tokio::test]
    async fn test_season_summaries_zero_fill_missing_season() {
        let (_dir, db_path) = setup_db();

        let summaries = engine(&db_path, BackendKind::InMemory)
            .season_summaries(EntityKind::Constructor, 9)
            .await
            .unwrap();

        assert_eq!(
            summaries,
            vec![
                SeasonSummary {
                    season: 2021,
                    points: 25.0,
                    wins: 1,
                    podiums: 1,
                    total_races: 1,
                },
                SeasonSummary::empty(2022),
                SeasonSummary {
                    season: 2023,
                    points: 25.0,
                    wins: 0,
                    podiums: 1,
                    total_races: 3,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_points_per_season_and_career() {
        let (_dir, db_path) = setup_db();
        let engine = engine(&db_path, BackendKind::InMemory);

        let points = engine.points_per_season(EntityKind::Constructor, 9).await.unwrap();
        assert_eq!(
            points,
            vec![
                SeasonPoints {
                    season: 2021,
                    points: 25.0,
                },
                SeasonPoints {
                    season: 2023,
                    points: 25.0,
                },
            ]
        );

        let career = engine.career_totals(EntityKind::Driver, 16).await.unwrap();
        assert_eq!(
            career,
            CareerTotals {
                total_races: 4,
                wins: 2,
                podiums: 3,
                total_points: 48.0,
            }
        );
    }

    #[tokio::test]
    async fn test_trace_driver_season() {
        let (_dir, db_path) = setup_db();

        let rows = engine(&db_path, BackendKind::InMemory)
            .trace(EntityKind::Driver, 16, SEASON_2023)
            .await
            .unwrap();

        let row = |race_name: &str, position: Option<i64>, points: f64| TraceRow {
            season: 2023,
            race_name: race_name.to_string(),
            position,
            points,
        };
        assert_eq!(
            rows,
            vec![
                row("Bahrain Grand Prix", Some(1), 8.0),
                row("Bahrain Grand Prix", Some(1), 25.0),
                row("Saudi Arabian Grand Prix", Some(3), 15.0),
                row("Australian Grand Prix", None, 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_season_and_empty_entity() {
        let (_dir, db_path) = setup_db();

        for backend in [BackendKind::InMemory, BackendKind::WindowedSql] {
            let engine = engine(&db_path, backend);

            let err = engine
                .progression(EntityKind::Driver, 1, 99)
                .await
                .unwrap_err();
            assert_eq!(err, StatsError::not_found("season", 99));

            let none = engine
                .progression(EntityKind::Driver, 4242, SEASON_2023)
                .await
                .unwrap();
            assert!(none.is_empty());
        }

        let summaries = engine(&db_path, BackendKind::InMemory)
            .season_summaries(EntityKind::Driver, 4242)
            .await
            .unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let (_dir, db_path) = setup_db();

        let store = SqliteRecordStore::open(&db_path).unwrap();
        store.run_schema_migrations(SCHEMA_DIR).unwrap();

        let summaries = StatsEngine::new(store)
            .season_summaries(EntityKind::Constructor, 9)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 3);
    }

    #[test]
    fn test_missing_schema_dir_is_reported() {
        let dir = tempdir().unwrap();
        let store = SqliteRecordStore::open(dir.path().join("racestats.db")).unwrap();

        let err = store
            .run_schema_migrations(dir.path().join("no-such-dir"))
            .unwrap_err();
        assert!(err.to_string().contains("Schema directory not found"));
    }
}
