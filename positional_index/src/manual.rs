/*!

This is the long-form manual for `positional_index` and `munietl`.

## Input formats

The following source types are supported. The tag passed with `--input-type` (or
`sourceType` in a job file) must match exactly.

* `SNIS` sanitation and utilities indicators, one column per indicator
* `FINBRA` municipal budget accounts, one row per account and column
* `IBGE_PIB`, `IBGE_CEMPRE` economic census tables, one column per indicator
* `IPEADATA` long series already in (code, year, value) form

Files may be `.csv` (comma or semicolon separated, UTF-8 or Windows-1252) or
spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.ods`).

### `SNIS`

Wide table. The municipality code is read from `Código do Município` (or
`Codigo do Municipio`, `Código IBGE`, `Cod_IBGE`) and the year from
`Ano de Referência` (or `Ano de Referencia`, `Ano`). Every other column which is
not a known descriptive column (municipality name, state, provider, ...) becomes
an indicator. Values are written with a decimal comma: `1.234,56`.

### `FINBRA`

The year is not in the data. It is taken from the file name, which must end with
`_YYYY.csv`, for instance `finbra_receitas_2021.csv`. A file whose name does not
follow this pattern is skipped with a warning, the other files of the batch are
still processed.

The indicator is built as `{Conta} em {Coluna}`, for instance
`1.0.0.0.00.0.0 - Receitas Correntes em Receitas Brutas Realizadas`. The value is
read from `Valor`.

FINBRA exports usually start with a few lines of description before the header.
Use `--first-row-index` to point at the header row.

### `IBGE_PIB` and `IBGE_CEMPRE`

Wide tables, like `SNIS`, with their own list of descriptive columns. The
placeholder `-` means that no value was published.

### `IPEADATA`

Long table with the columns `CODE`, `YEAR`, `TERCODIGO`, `NIVNOME` and a value
column whose name starts with `VALUE`, for example `VALUE (R$)`. The name of the
value column is found from the first row; a file without such a column is skipped
with a warning.

When `NIVNOME` is present, only the rows at the municipal level (`Municípios`) are
kept. Values use a decimal point and are published in thousands: they are
multiplied by 1000.

## Positional index

Observations are grouped by indicator and year. Within a group of `N`
observations sorted by decreasing value, the observation at (0-based) place `i`
receives the index

```text
1 - i / (N - 1)
```

so that the highest value gets 1 and the lowest gets 0. A group with a single
observation gets 1. Observations with the same value receive the average of the
indices of their run. For example, the values `10, 10, 5` get the indices
`0.75, 0.75, 0`.

The position is then

```text
round(N * (1 - index) + index)
```

which is 1 for the best observation and `N` for the worst. Because it is computed
from the averaged index, tied observations share a position and positions are not
always consecutive.

Higher values always rank first. Indicators for which a lower value is better
(losses, costs) are not inverted.

## Output

The output is a semicolon-separated file with the columns

```text
Codigo_Municipio;Nome_Indicador;Ano_Observacao;Valor;Indice_Posicional;Posicao
```

Decimal numbers are written with a decimal comma.

*/
