/*!
# Shopsearch API documentation

## Search

Endpoint: `POST /api/search`

Takes a shopper's free-text query, asks a language model to extract what they
want, and returns products from the `products` table that match.

### Request

A JSON object with a single required key:

- `query` - the text the shopper typed, in any language the model understands.

```json
{ "query": "laptop buat gaming budget 15 juta" }
```

### Filtering

The model is asked for `product_type`, `use_case` (a list), `budget` (a number)
and an optional `style`. Products are returned when all of these hold:

- their `tags` contain `product_type`,
- their `price` is at most `budget`,
- if `use_case` is a non-empty list, their `use_case` contains every entry of it.

`style` is not used for filtering. Results are neither ranked nor paginated.

### Responses

- `200` - `{ "results": [ ... ] }`, with every row exactly as the database
  returned it.
- `400` - `{ "error": "Missing query" }` when `query` is absent, empty, not a
  string, the body is not a JSON object, or the request's `Content-Type` is
  not `application/json`.
- `405` - `{ "message": "Only POST requests allowed" }` for any other method.
- `500` - `{ "error": "Failed to process query" }` when anything goes wrong
  after the request was accepted: the model could not be reached, its answer was
  not the expected JSON, or the database rejected the query. Details are only
  written to the server log.

## Dockerflow

- `/__lbheartbeat__` - empty `200` when the server is accepting requests.
- `/__heartbeat__` - the running version and the names of the configured
  intent extractor and product store.
- `/__version__` - the contents of `version.json`.
- `/__error__` - always fails with a `500`, to check error reporting.
*/
