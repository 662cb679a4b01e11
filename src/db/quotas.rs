use crate::schema::daily_quotas;
use chrono::NaiveDate;
use diesel::{pg::upsert::on_constraint, prelude::*};
use serde::{Deserialize, Serialize};

const PRIMARY_KEY: &str = "daily_quotas_pkey";

/// Generation counter for one category on one day. A new day is a new key,
/// so nothing ever resets a row.
#[derive(
    Queryable,
    Insertable,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[table_name = "daily_quotas"]
pub struct DailyQuota {
    pub day: NaiveDate,
    pub category: String,
    pub generated: i32,
    pub target: i32,
}

pub fn get(
    day: NaiveDate,
    category: &str,
    connection: &PgConnection,
) -> QueryResult<Option<DailyQuota>> {
    daily_quotas::table
        .find((day, category))
        .get_result::<DailyQuota>(connection)
        .optional()
}

/// Single-statement increment; concurrent callers never lose an update.
pub fn increment(
    day: NaiveDate,
    category: &str,
    default_target: i32,
    connection: &PgConnection,
) -> QueryResult<DailyQuota> {
    diesel::insert_into(daily_quotas::table)
        .values(DailyQuota {
            day,
            category: category.to_string(),
            generated: 1,
            target: default_target,
        })
        .on_conflict(on_constraint(PRIMARY_KEY))
        .do_update()
        .set(daily_quotas::generated.eq(daily_quotas::generated + 1))
        .get_result(connection)
}

/// Sets today's target, leaving the generated count alone.
pub fn set_target(
    day: NaiveDate,
    category: &str,
    target: i32,
    connection: &PgConnection,
) -> QueryResult<DailyQuota> {
    diesel::insert_into(daily_quotas::table)
        .values(DailyQuota {
            day,
            category: category.to_string(),
            generated: 0,
            target,
        })
        .on_conflict(on_constraint(PRIMARY_KEY))
        .do_update()
        .set(daily_quotas::target.eq(target))
        .get_result(connection)
}
