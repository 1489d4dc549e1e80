/*!

This is the long-form manual for `leader_influence` and the `influence` command.

## Input data

The snapshot is a directory of JSON files, one array of records per table:

* `viewpoint_groups.json`, `profiles.json`, `persons.json`
* `profile_viewpoint_group_rels.json` (the role is read from `type` or `role`:
  `leader`, `supporter` or `member`)
* `voter_verifications.json`, `jurisdictions.json`,
  `voter_verification_jurisdiction_rels.json`
* `elections.json`, `ballot_items.json`, `ballot_item_options.json`
* `races.json`, `candidacies.json`, `offices.json`, `office_terms.json`
* `measures.json`, `influence_targets.json`, `parties.json`

A missing file is an empty table. A file that cannot be parsed stops the run.
Unknown fields are ignored.

### Enhancement feeds

Three optional files can enrich the dashboard:

* `--upcoming-elections`: an array of `{id, electionDay, type?, office?: {name, level?}, candidateCount?}`
* `--peer-leaders`: an array of `{id, name, totalSupporters, groups: [{id, title?, supporterCount?}]}`
* `--benchmarks`: an array of `{growthRate}` or of bare numbers

Entries that do not have this shape are dropped with a warning. A feed that
cannot be read at all is ignored.

## Metrics

All the metrics are computed for the *main group* at a reference date
(`--today`, the current date by default).

### Verified voters

The distinct persons related to the main group with at least one fully
verified voter verification. The verification rate is this count over the
number of related profiles, in percent. The growth trend is cumulative per
week (weeks start on Monday), and the weekly growth rate averages the last
four week-over-week changes.

### Jurisdiction concentration

The verified voters are counted in each of their jurisdictions. The
concentration index is the Herfindahl-Hirschman index of these counts:

| index      | reading   |
|------------|-----------|
| > 0.5      | Very High |
| > 0.25     | High      |
| > 0.15     | Medium    |
| otherwise  | Low       |

### Ballot exposure

An upcoming ballot item counts when at least one supporter verification is
located in its jurisdiction. Its leverage score is:

```text
verified supporters x office weight x urgency weight
office weight:  local 3.0, state 2.0, federal 1.0
urgency weight: < 30 days 1.0, < 90 days 0.7, otherwise 0.4
```

The leverage level is `kingmaker` with 4 candidates or more and 500 verified
supporters, `significant` with 2 candidates and 200 verified supporters or
with 100 verified supporters in any case, `marginal` otherwise.

Elections from the upcoming-elections feed have no jurisdiction: their
supporter count is estimated as 10% of the verified voters and tagged
`estimated`.

### Recommended actions

At most five recommendations, in this order:
1. focus on up to two urgent or high-leverage ballot items
2. verify more supporters in a strong jurisdiction
3. expand geographically when the concentration index is above 0.5
4. recruit more organizers when few supporters lead groups of their own
5. prepare for the later ballot items

When no rule applies, the best ballot item is recommended.

## Configuration

The configuration file is a JSON object. Every entry is optional and the
command line flags take precedence:

```text
{
  "mainGroupId": "4d627244-5598-4403-8704-979140ae9cac",
  "dataDirectory": "data",
  "today": "2026-10-15",
  "output": "dashboard.json",
  "upcomingElections": "feeds/elections.json",
  "peerLeaders": "feeds/leaders.json",
  "benchmarks": "feeds/benchmarks.json",
  "rules": {
    "topJurisdictions": 10,
    "maxInsights": 5,
    "apiSupporterEstimateRatio": 0.1,
    "primaryElectionsOnly": false
  }
}
```

Relative paths are resolved against the directory of the configuration file.
`maxInsights` must be between 1 and 5.

## Checking against a reference

With `--reference`, the computed dashboard is compared with the given JSON
file. Pass `--today` to get a reproducible `lastUpdated` field. A difference
is printed and the command fails.

 */
